//! 班级汇总服务 - 业务能力层
//!
//! 汇总本批次所有成功结果的反馈文本，再调用一次模型生成班级层面的分析。

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::{GenerationRequest, GenerativeBackend};
use crate::error::AppResult;
use crate::models::{CohortSummary, GradedResult, ReportBlock};
use crate::services::model_selector::ModelResolver;
use crate::services::normalizer::delatex;

/// 班级汇总服务
pub struct CohortSummarizer<B: ?Sized> {
    backend: Arc<B>,
    models: Arc<ModelResolver>,
    char_budget: usize,
}

impl<B> CohortSummarizer<B>
where
    B: GenerativeBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, models: Arc<ModelResolver>, char_budget: usize) -> Self {
        Self {
            backend,
            models,
            char_budget,
        }
    }

    /// 生成班级汇总
    ///
    /// # 参数
    /// - `results`: 本批次全部结果（缓存命中与新评分的都包括）
    /// - `threshold`: 错误概念上报阈值，(0, 1)
    ///
    /// # 返回
    /// 没有可用的反馈文本时返回 `Ok(None)`
    pub async fn summarize(
        &self,
        results: &[GradedResult],
        threshold: f64,
    ) -> AppResult<Option<CohortSummary>> {
        let student_count = results.iter().filter(|r| !r.is_error()).count();
        let feedback = collect_feedback_text(results, self.char_budget);
        if feedback.trim().is_empty() {
            info!("没有可汇总的反馈，跳过班级汇总");
            return Ok(None);
        }

        debug!(
            "汇总 {} 份结果，反馈文本 {} 字符",
            student_count,
            feedback.chars().count()
        );

        let model = self.models.resolve(self.backend.as_ref()).await;
        let prompt = build_summary_prompt(&feedback, threshold);
        let raw = self
            .backend
            .generate(GenerationRequest {
                model,
                prompt: &prompt,
                file: None,
                json_output: false,
            })
            .await?;

        Ok(Some(parse_summary(&raw, student_count)))
    }
}

/// 拼接所有成功结果的反馈文本，按字符数截断
pub fn collect_feedback_text(results: &[GradedResult], char_budget: usize) -> String {
    let mut text = String::new();
    for report in results.iter().filter_map(GradedResult::as_report) {
        text.push_str(&format!("Student: {}\n", report.student_name));
        if !report.overall_feedback.is_empty() {
            text.push_str(&format!("Overall: {}\n", report.overall_feedback));
        }
        for q in &report.questions {
            if !q.feedback.is_empty() {
                text.push_str(&format!("Q{}: {}\n", q.question_number, q.feedback));
            }
        }
        text.push('\n');
    }

    if text.chars().count() > char_budget {
        text.chars().take(char_budget).collect()
    } else {
        text
    }
}

/// 构建班级汇总提示词
pub fn build_summary_prompt(feedback: &str, threshold: f64) -> String {
    let percent = threshold * 100.0;
    format!(
        r#"You are an experienced Algebra teacher reviewing the graded feedback for an entire class.

Below is the feedback each student received:

{}

Write a class-level report with exactly these three sections, each introduced by a bold heading on its own line:

**Common Misconceptions**
List at least 3 of the most common misconceptions as bullet points ("* "). Also include every misconception that affects more than {:.0}% of the class.

**Problem Areas**
Describe the topics or question types where the class struggled most.

**Recommendations**
Give concrete next steps for instruction, as a numbered list ("1. ", "2. ", "3. ").
"#,
        feedback, percent
    )
}

/// 单行解析为语义块
///
/// - `**...**` → 标题
/// - `* ` / `- ` → 列表项
/// - `数字. ` → 强调步骤
/// - 空行 → 分隔
/// - 其他 → 段落
pub fn parse_line(line: &str) -> ReportBlock {
    let line = line.trim();
    if line.is_empty() {
        return ReportBlock::Break;
    }

    if line.len() >= 4 && line.starts_with("**") && line.ends_with("**") {
        return ReportBlock::Heading(delatex(line.trim_matches('*').trim()));
    }

    if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return ReportBlock::Bullet(delatex(rest.trim()));
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && line[digits..].starts_with(". ") {
        return ReportBlock::Step(delatex(line));
    }

    ReportBlock::Paragraph(delatex(line))
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Misconceptions,
    ProblemAreas,
    Recommendations,
}

/// 将模型回复解析为班级汇总
pub fn parse_summary(raw: &str, student_count: usize) -> CohortSummary {
    let blocks: Vec<ReportBlock> = raw.lines().map(parse_line).collect();

    let mut misconceptions = Vec::new();
    let mut problem_areas: Vec<String> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();
    let mut section = Section::Preamble;

    for block in &blocks {
        match block {
            ReportBlock::Heading(title) => {
                let lower = title.to_lowercase();
                section = if lower.contains("misconception") {
                    Section::Misconceptions
                } else if lower.contains("problem") {
                    Section::ProblemAreas
                } else if lower.contains("recommend") {
                    Section::Recommendations
                } else {
                    section
                };
            }
            ReportBlock::Bullet(text) | ReportBlock::Step(text) | ReportBlock::Paragraph(text) => {
                match section {
                    Section::Misconceptions => misconceptions.push(text.clone()),
                    Section::ProblemAreas => problem_areas.push(text.clone()),
                    Section::Recommendations => recommendations.push(text.clone()),
                    Section::Preamble => {}
                }
            }
            ReportBlock::Title(_) | ReportBlock::Break => {}
        }
    }

    CohortSummary {
        misconceptions,
        problem_areas: problem_areas.join("\n"),
        recommendations: recommendations.join("\n"),
        blocks,
        student_count,
    }
}
