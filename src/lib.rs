//! # Quiz Grader
//!
//! 批量批改手写数学作业（PDF）的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 与远端生成模型通信，只暴露能力
//! - `GenerativeBackend` - 上传、查询文件状态、列出模型、生成
//! - `GeminiClient` - 基于 HTTP 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档或单次调用
//! - `ModelResolver` - 模型发现与选择
//! - `GradingService` - 上传 → 等待处理 → 评分（带重试）
//! - `ResultCache` - 评分记录的读写
//! - `CohortSummarizer` - 班级汇总
//! - `ReportWriter` - 反馈报告渲染与落盘
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份文档"的完整处理流程
//! - `DocumentCtx` - 上下文封装（序号 + 文档名）
//! - `DocumentFlow` - 流程编排（缓存 → 评分 → 写缓存 → 报告）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 惰性结果流、汇总与统计
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GeminiClient, GenerativeBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{BatchInput, GradedReport, GradedResult, GradingRequest};
pub use orchestrator::{BatchCompletion, BatchHandle, BatchOrchestrator, BatchStats};
pub use workflow::{DocumentCtx, DocumentFlow, DocumentOutcome};
