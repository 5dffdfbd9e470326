//! 批量评分处理器 - 编排层
//!
//! ## 职责
//!
//! 把一个目录的文档变成一条按文件名顺序产出的结果流，结束时生成班级汇总。
//!
//! ## 核心功能
//!
//! 1. **惰性处理**：结果流由 `stream::unfold` 构建，消费者拉取下一条时才处理下一份文档
//! 2. **严格串行**：同一时刻只有一份文档在处理，产出顺序即输入顺序
//! 3. **模型选择**：每次运行新建 `ModelResolver`，整批只做一次模型发现
//! 4. **收尾汇总**：输入耗尽后调用汇总服务，保存汇总文件，通过 `BatchHandle` 交付
//! 5. **全局统计**：新评分 / 复用 / 失败数量与平均得分率
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个文档的细节，委托 `workflow::DocumentFlow`
//! - **提前结束**：消费者中途丢弃结果流时不会生成汇总，`BatchHandle::wait` 返回 None

use std::sync::Arc;
use std::vec::IntoIter;

use futures::stream::{self, Stream};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::clients::GenerativeBackend;
use crate::config::Config;
use crate::models::{BatchInput, CohortSummary, GradedResult, GradingRequest};
use crate::services::{CohortSummarizer, ModelResolver, ReportWriter, ResultCache};
use crate::utils::logging::{log_documents_loaded, print_final_stats};
use crate::workflow::{DocumentCtx, DocumentFlow, DocumentOutcome};

/// 批次统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// 本次新评分成功
    pub graded: usize,
    /// 复用已有记录
    pub cached: usize,
    pub failed: usize,
    /// 成功结果（含复用）的平均得分率，没有可计算的结果时为 None
    pub average_percentage: Option<f64>,
}

impl BatchStats {
    fn record(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Graded => self.graded += 1,
            DocumentOutcome::Cached => self.cached += 1,
            DocumentOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.graded + self.cached + self.failed
    }
}

/// 计算成功结果的平均得分率
pub fn average_percentage(results: &[GradedResult]) -> Option<f64> {
    let percentages: Vec<f64> = results
        .iter()
        .filter_map(GradedResult::as_report)
        .filter_map(|r| r.percentage())
        .collect();
    if percentages.is_empty() {
        None
    } else {
        Some(percentages.iter().sum::<f64>() / percentages.len() as f64)
    }
}

/// 批处理完成信息
#[derive(Debug, Clone)]
pub struct BatchCompletion {
    pub stats: BatchStats,
    /// 汇总失败或没有可汇总内容时为 None
    pub summary: Option<CohortSummary>,
}

/// 批处理完成句柄
pub struct BatchHandle {
    rx: oneshot::Receiver<BatchCompletion>,
}

impl BatchHandle {
    /// 等待结果流耗尽后的汇总
    ///
    /// # 返回
    /// 结果流被提前丢弃时返回 None
    pub async fn wait(self) -> Option<BatchCompletion> {
        self.rx.await.ok()
    }
}

/// 批量评分编排器
pub struct BatchOrchestrator<B: ?Sized> {
    backend: Arc<B>,
    config: Config,
}

impl<B> BatchOrchestrator<B>
where
    B: GenerativeBackend + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, config: Config) -> Self {
        Self { backend, config }
    }

    /// 开始一次批处理
    ///
    /// # 参数
    /// - `input`: 已排序的待评分文档
    ///
    /// # 返回
    /// `(结果流, 完成句柄)`；结果流每份文档恰好产出一条
    pub fn run(
        &self,
        input: BatchInput,
    ) -> (impl Stream<Item = GradedResult> + Send + 'static, BatchHandle) {
        let (tx, rx) = oneshot::channel();

        let models = Arc::new(ModelResolver::new(self.config.preferred_models.clone()));
        let cache = ResultCache::for_batch(&input.folder, &self.config.feedback_dir_name);
        let feedback_dir = cache.dir().to_path_buf();

        log_documents_loaded(input.documents.len(), &feedback_dir.display().to_string());

        let state = RunState {
            flow: DocumentFlow::new(
                Arc::clone(&self.backend),
                Arc::clone(&models),
                cache,
                ReportWriter::new(feedback_dir.clone()),
                &self.config,
            ),
            summarizer: CohortSummarizer::new(
                Arc::clone(&self.backend),
                models,
                self.config.summary_char_budget,
            ),
            summary_writer: ReportWriter::new(feedback_dir),
            threshold: self.config.misconception_threshold,
            log_file: self.config.output_log_file.clone(),
            total: input.documents.len(),
            documents: input.documents.into_iter(),
            index: 0,
            results: Vec::new(),
            stats: BatchStats::default(),
            completion: Some(tx),
        };

        let stream = stream::unfold(state, |mut state| async move {
            match state.documents.next() {
                Some(request) => {
                    let result = state.process(request).await;
                    Some((result, state))
                }
                None => {
                    state.finish().await;
                    None
                }
            }
        });

        (stream, BatchHandle { rx })
    }
}

/// 单次运行的状态，随结果流移动
struct RunState<B: ?Sized> {
    flow: DocumentFlow<B>,
    summarizer: CohortSummarizer<B>,
    summary_writer: ReportWriter,
    threshold: f64,
    log_file: String,
    documents: IntoIter<GradingRequest>,
    index: usize,
    total: usize,
    results: Vec<GradedResult>,
    stats: BatchStats,
    completion: Option<oneshot::Sender<BatchCompletion>>,
}

impl<B> RunState<B>
where
    B: GenerativeBackend + ?Sized,
{
    async fn process(&mut self, request: GradingRequest) -> GradedResult {
        self.index += 1;
        let ctx = DocumentCtx::new(self.index, self.total, request.document_id.clone());

        let (result, outcome) = self.flow.run(&request, &ctx).await;
        self.stats.record(outcome);
        self.results.push(result.clone());
        result
    }

    async fn finish(&mut self) {
        let Some(tx) = self.completion.take() else {
            return;
        };

        let summary = match self.summarizer.summarize(&self.results, self.threshold).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("⚠️ 班级汇总生成失败: {}", e);
                None
            }
        };

        if let Some(summary) = &summary {
            if let Err(e) = self.summary_writer.write_cohort_summary(summary).await {
                warn!("⚠️ 班级汇总保存失败: {}", e);
            }
        }

        self.stats.average_percentage = average_percentage(&self.results);
        print_final_stats(&self.stats, &self.log_file);

        let completion = BatchCompletion {
            stats: self.stats.clone(),
            summary,
        };
        if tx.send(completion).is_err() {
            info!("完成句柄已被丢弃，忽略汇总结果");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradedReport;

    fn graded(total: f64, max: f64) -> GradedResult {
        GradedResult::Graded(GradedReport {
            student_name: "S".to_string(),
            quiz_name: String::new(),
            total_score: total,
            max_score: max,
            questions: vec![],
            overall_feedback: String::new(),
            document_id: "s.pdf".to_string(),
        })
    }

    #[test]
    fn test_average_percentage() {
        let results = vec![
            graded(8.0, 10.0),
            graded(3.0, 6.0),
            GradedResult::failure("x.pdf", "boom"),
            graded(1.0, 0.0),
        ];
        let avg = average_percentage(&results).unwrap();
        assert!((avg - 65.0).abs() < 1e-9);
        assert_eq!(average_percentage(&[]), None);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = BatchStats::default();
        stats.record(DocumentOutcome::Graded);
        stats.record(DocumentOutcome::Cached);
        stats.record(DocumentOutcome::Failed);
        stats.record(DocumentOutcome::Cached);
        assert_eq!((stats.graded, stats.cached, stats.failed), (1, 2, 1));
        assert_eq!(stats.total(), 4);
    }
}
