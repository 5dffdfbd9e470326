//! 报告输出 - 业务能力层
//!
//! 报告的语义结构由 `models::report` 构建，这里只负责渲染和落盘。
//! 渲染器可替换，默认提供 Markdown。

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{CohortSummary, GradedReport, ReportBlock, ReportDocument};

/// 班级汇总 JSON 文件名
pub const SUMMARY_JSON_FILE: &str = "class_summary.json";
/// 班级汇总报告文件名（不含扩展名）
pub const SUMMARY_REPORT_STEM: &str = "Class Summary";

/// 报告渲染器
pub trait ReportRenderer: Send + Sync {
    /// 输出文件扩展名（不含点）
    fn extension(&self) -> &'static str;

    fn render(&self, document: &ReportDocument) -> String;
}

/// Markdown 渲染器
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, document: &ReportDocument) -> String {
        let mut out = String::new();
        for block in &document.blocks {
            match block {
                ReportBlock::Title(text) => out.push_str(&format!("# {}\n\n", text)),
                ReportBlock::Heading(text) => out.push_str(&format!("## {}\n\n", text)),
                ReportBlock::Bullet(text) => out.push_str(&format!("- {}\n", text)),
                ReportBlock::Step(text) => out.push_str(&format!("**{}**\n\n", text)),
                ReportBlock::Paragraph(text) => out.push_str(&format!("{}\n\n", text)),
                ReportBlock::Break => out.push('\n'),
            }
        }
        out
    }
}

#[derive(Serialize)]
struct SummaryArtifact<'a> {
    generated_at: String,
    #[serde(flatten)]
    summary: &'a CohortSummary,
}

/// 报告写入器
pub struct ReportWriter {
    dir: PathBuf,
    renderer: Box<dyn ReportRenderer>,
}

impl ReportWriter {
    /// 使用 Markdown 渲染器
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_renderer(dir, Box::new(MarkdownRenderer))
    }

    pub fn with_renderer(dir: impl Into<PathBuf>, renderer: Box<dyn ReportRenderer>) -> Self {
        Self {
            dir: dir.into(),
            renderer,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入单个学生的反馈报告
    ///
    /// # 返回
    /// 报告文件路径
    pub async fn write_student_report(&self, report: &GradedReport) -> AppResult<PathBuf> {
        let document = ReportDocument::for_student(report);
        self.write_document(&document).await
    }

    /// 写入班级汇总：JSON 记录 + 渲染后的报告
    ///
    /// # 返回
    /// `(json 路径, 报告路径)`
    pub async fn write_cohort_summary(
        &self,
        summary: &CohortSummary,
    ) -> AppResult<(PathBuf, PathBuf)> {
        self.ensure_dir().await?;

        let artifact = SummaryArtifact {
            generated_at: Local::now().to_rfc3339(),
            summary,
        };
        let json_path = self.dir.join(SUMMARY_JSON_FILE);
        let content = serde_json::to_string_pretty(&artifact)?;
        fs::write(&json_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(json_path.display().to_string(), e))?;

        let mut blocks = vec![ReportBlock::Title(SUMMARY_REPORT_STEM.to_string())];
        blocks.extend(summary.blocks.iter().cloned());
        let document = ReportDocument {
            file_stem: SUMMARY_REPORT_STEM.to_string(),
            blocks,
        };
        let report_path = self.write_document(&document).await?;

        info!("📝 班级汇总已保存: {}", json_path.display());
        Ok((json_path, report_path))
    }

    async fn write_document(&self, document: &ReportDocument) -> AppResult<PathBuf> {
        self.ensure_dir().await?;
        let path = self
            .dir
            .join(format!("{}.{}", document.file_stem, self.renderer.extension()));
        fs::write(&path, self.renderer.render(document))
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(path)
    }

    async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.dir.display().to_string(), e))
    }
}
