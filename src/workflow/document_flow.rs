//! 文档处理流程 - 流程层
//!
//! 核心职责：定义"一份文档"的完整处理流程
//!
//! 流程顺序：
//! 1. 查缓存，命中则直接返回（不调用模型）
//! 2. 评分
//! 3. 成功时写缓存、写反馈报告（失败只记日志，不影响结果）

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::GenerativeBackend;
use crate::config::Config;
use crate::models::{GradedResult, GradingRequest};
use crate::services::{GradingService, ModelResolver, ReportWriter, ResultCache};
use crate::workflow::document_ctx::DocumentCtx;

/// 文档处理结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// 缓存命中
    Cached,
    /// 本次评分成功
    Graded,
    /// 评分失败
    Failed,
}

/// 文档处理流程
///
/// - 决定何时读缓存、何时评分、何时写缓存
/// - 只依赖业务能力（services）
pub struct DocumentFlow<B: ?Sized> {
    grading: GradingService<B>,
    cache: ResultCache,
    reports: ReportWriter,
}

impl<B> DocumentFlow<B>
where
    B: GenerativeBackend + ?Sized,
{
    pub fn new(
        backend: Arc<B>,
        models: Arc<ModelResolver>,
        cache: ResultCache,
        reports: ReportWriter,
        config: &Config,
    ) -> Self {
        Self {
            grading: GradingService::new(backend, models, config),
            cache,
            reports,
        }
    }

    pub async fn run(
        &self,
        request: &GradingRequest,
        ctx: &DocumentCtx,
    ) -> (GradedResult, DocumentOutcome) {
        // ========== 1. 缓存 ==========
        if let Some(report) = self.cache.load(&request.document_id).await {
            info!("{} ♻️ 已有评分记录，跳过", ctx);
            return (GradedResult::Graded(report), DocumentOutcome::Cached);
        }

        // ========== 2. 评分 ==========
        info!("{} 📝 正在评分...", ctx);
        let report = match self.grading.grade(request).await {
            GradedResult::Graded(report) => report,
            GradedResult::Failed(failure) => {
                warn!("{} ❌ 评分失败: {}", ctx, failure.error);
                return (GradedResult::Failed(failure), DocumentOutcome::Failed);
            }
        };

        // ========== 3. 持久化 ==========
        if let Err(e) = self.cache.save(&report).await {
            warn!("{} ⚠️ 写入缓存失败: {}", ctx, e);
        }

        match self.reports.write_student_report(&report).await {
            Ok(path) => info!("{} 📄 反馈报告: {}", ctx, path.display()),
            Err(e) => warn!("{} ⚠️ 写入反馈报告失败: {}", ctx, e),
        }

        info!("{} ✓ 评分完成: {} / {}", ctx, report.total_score, report.max_score);
        (GradedResult::Graded(report), DocumentOutcome::Graded)
    }
}
