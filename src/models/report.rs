//! 报告文档的语义结构
//!
//! 只描述"写什么"，排版交给外部渲染器（见 `services::report_writer`）。

use crate::models::graded::GradedReport;
use crate::services::normalizer::delatex;
use serde::{Deserialize, Serialize};

/// 报告中的一个语义块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ReportBlock {
    Title(String),
    Heading(String),
    Bullet(String),
    /// 带编号的强调步骤，文本保留编号
    Step(String),
    Paragraph(String),
    Break,
}

/// 一份待渲染的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// 不含扩展名的输出文件名
    pub file_stem: String,
    pub blocks: Vec<ReportBlock>,
}

impl ReportDocument {
    /// 构建单个学生的反馈报告
    pub fn for_student(report: &GradedReport) -> Self {
        let student_name = non_empty_or(&report.student_name, "Unknown Student");
        let quiz_name = non_empty_or(&report.quiz_name, "Quiz");

        let mut blocks = vec![
            ReportBlock::Title(delatex(&format!("{} Feedback {}", student_name, quiz_name))),
            ReportBlock::Paragraph(format!(
                "Total Score: {} / {}",
                report.total_score, report.max_score
            )),
        ];

        if !report.overall_feedback.is_empty() {
            blocks.push(ReportBlock::Heading("Overall Feedback".to_string()));
            blocks.push(ReportBlock::Paragraph(delatex(&report.overall_feedback)));
        }

        if !report.questions.is_empty() {
            blocks.push(ReportBlock::Heading("Question Details".to_string()));
            for q in &report.questions {
                let mut header = format!(
                    "Question {} ({}/{})",
                    q.question_number, q.score, q.max_points
                );
                if q.partial_credit_awarded {
                    header.push_str(" (Partial Credit Awarded)");
                }
                blocks.push(ReportBlock::Heading(delatex(&header)));
                blocks.push(ReportBlock::Paragraph(delatex(&q.feedback)));
            }
        }

        Self {
            file_stem: format!(
                "{} Feedback {}",
                sanitize_file_component(student_name),
                sanitize_file_component(quiz_name)
            ),
            blocks,
        }
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// 文件名中不允许出现路径分隔符
pub fn sanitize_file_component(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graded::QuestionResult;

    fn sample_report() -> GradedReport {
        GradedReport {
            student_name: "Ana/B".to_string(),
            quiz_name: "Quiz 1".to_string(),
            total_score: 7.5,
            max_score: 10.0,
            questions: vec![QuestionResult {
                question_number: "1".to_string(),
                score: 1.5,
                max_points: 2.0,
                feedback: r"Wrote $\frac{1}{2}$ as 2".to_string(),
                partial_credit_awarded: true,
            }],
            overall_feedback: "Good work".to_string(),
            document_id: "ana.pdf".to_string(),
        }
    }

    #[test]
    fn test_student_report_blocks() {
        let doc = ReportDocument::for_student(&sample_report());
        assert_eq!(doc.file_stem, "Ana-B Feedback Quiz 1");
        assert_eq!(
            doc.blocks[0],
            ReportBlock::Title("Ana/B Feedback Quiz 1".to_string())
        );
        assert!(doc
            .blocks
            .contains(&ReportBlock::Paragraph("Total Score: 7.5 / 10".to_string())));
        assert!(doc.blocks.contains(&ReportBlock::Heading(
            "Question 1 (1.5/2) (Partial Credit Awarded)".to_string()
        )));
        assert!(doc
            .blocks
            .contains(&ReportBlock::Paragraph("Wrote (1)/(2) as 2".to_string())));
    }

    #[test]
    fn test_missing_names_fall_back() {
        let mut report = sample_report();
        report.student_name = String::new();
        report.quiz_name = " ".to_string();
        let doc = ReportDocument::for_student(&report);
        assert_eq!(doc.file_stem, "Unknown Student Feedback Quiz");
    }
}
