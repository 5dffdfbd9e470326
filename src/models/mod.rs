pub mod document;
pub mod graded;
pub mod loaders;
pub mod report;
pub mod summary;

pub use document::{BatchInput, GradingRequest};
pub use graded::{
    GradedReport, GradedResult, GradingFailure, GradingResponse, QuestionResponse, QuestionResult,
};
pub use loaders::{discover_documents, load_rubric_text};
pub use report::{ReportBlock, ReportDocument};
pub use summary::CohortSummary;
