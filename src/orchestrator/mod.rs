//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量评分处理器
//! - 把 `BatchInput` 变成惰性结果流
//! - 每次运行共享一个 `ModelResolver`
//! - 输入耗尽后生成班级汇总
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<GradingRequest>)
//!     ↓
//! workflow::DocumentFlow (处理单个文档：缓存 → 评分 → 报告)
//!     ↓
//! services (能力层：grading / cache / summary / report)
//!     ↓
//! clients (基础设施：GenerativeBackend)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，DocumentFlow 管单个
//! 2. **向下依赖**：编排层 → workflow → services → clients
//! 3. **无业务逻辑**：只做调度和统计

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{
    BatchCompletion, BatchHandle, BatchOrchestrator, BatchStats,
};
