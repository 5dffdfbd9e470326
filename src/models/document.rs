use std::path::PathBuf;
use std::sync::Arc;

/// 单个文档的评分请求
///
/// 每次批处理中每个文档构造一次，之后不可变。
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// 批处理目录内的文件名，同时作为缓存键
    pub document_id: String,
    pub path: PathBuf,
    pub rubric_text: Arc<str>,
}

impl GradingRequest {
    pub fn new(path: PathBuf, rubric_text: Arc<str>) -> Self {
        let document_id = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            document_id,
            path,
            rubric_text,
        }
    }
}

/// 一次批处理的输入
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// 输入目录（反馈目录位于其下）
    pub folder: PathBuf,
    /// 按文件名排序的待评分文档
    pub documents: Vec<GradingRequest>,
}
