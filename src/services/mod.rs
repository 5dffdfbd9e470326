pub mod grading_service;
pub mod model_selector;
pub mod normalizer;
pub mod report_writer;
pub mod result_cache;
pub mod summary_service;

pub use grading_service::{GradingService, RetryPolicy};
pub use model_selector::{select_model, ModelResolver, FALLBACK_MODEL};
pub use normalizer::{clean_json_text, delatex};
pub use report_writer::{MarkdownRenderer, ReportRenderer, ReportWriter};
pub use result_cache::ResultCache;
pub use summary_service::CohortSummarizer;
