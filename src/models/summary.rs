use crate::models::report::ReportBlock;
use serde::{Deserialize, Serialize};

/// 班级汇总
///
/// 每次批处理生成一次，不参与缓存与断点续跑。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    /// 常见错误概念（按模型给出的顺序）
    pub misconceptions: Vec<String>,
    pub problem_areas: String,
    pub recommendations: String,
    /// 行级解析后的完整结构，交给渲染器
    pub blocks: Vec<ReportBlock>,
    /// 参与汇总的学生（文档）数量
    pub student_count: usize,
}
