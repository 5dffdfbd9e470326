//! 评分服务 - 业务能力层
//!
//! 只负责"给一份文档按评分标准打分"，不关心缓存和流程。
//!
//! ## 状态机
//!
//! ```text
//! UPLOADED → PROCESSING → ACTIVE → 生成 + 解析（最多 N 次，线性退避）
//!                       ↘ FAILED → 失败记录（不重试）
//! ```
//!
//! `grade` 是全函数：任何错误都被转换为 `GradedResult::Failed`，不会向上抛出。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::{FileState, GenerationRequest, GenerativeBackend, RemoteFile};
use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{GradedReport, GradedResult, GradingRequest, GradingResponse};
use crate::services::model_selector::ModelResolver;
use crate::services::normalizer::clean_json_text;
use crate::utils::logging::truncate_text;

/// 重试策略：第 n 次失败后等待 `base_delay * n`
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// 评分服务
pub struct GradingService<B: ?Sized> {
    backend: Arc<B>,
    models: Arc<ModelResolver>,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<B> GradingService<B>
where
    B: GenerativeBackend + ?Sized,
{
    /// 创建新的评分服务
    ///
    /// `models` 在同一批次内共享，保证模型发现只做一次。
    pub fn new(backend: Arc<B>, models: Arc<ModelResolver>, config: &Config) -> Self {
        Self {
            backend,
            models,
            poll_interval: config.poll_interval,
            retry: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                base_delay: config.retry_base_delay,
            },
        }
    }

    /// 对单个文档评分
    ///
    /// # 返回
    /// 成功时为完整记录，失败时为 `{ error, document_id }`
    pub async fn grade(&self, request: &GradingRequest) -> GradedResult {
        // 上传与处理阶段：失败即终止，不重试
        let file = match self.upload_and_wait(request).await {
            Ok(file) => file,
            Err(e) => {
                warn!("❌ {} 上传/处理失败: {}", request.document_id, e);
                return GradedResult::failure(&request.document_id, e.to_string());
            }
        };

        let model = self.models.resolve(self.backend.as_ref()).await;
        let prompt = build_grading_prompt(&request.rubric_text);

        match self.generate_with_retry(model, &prompt, &file, request).await {
            Ok(report) => GradedResult::Graded(report),
            Err(e) => GradedResult::failure(&request.document_id, e.to_string()),
        }
    }

    async fn upload_and_wait(&self, request: &GradingRequest) -> AppResult<RemoteFile> {
        let mut file = self
            .backend
            .upload_document(&request.path, &request.document_id)
            .await?;

        while file.state == FileState::Processing {
            tokio::time::sleep(self.poll_interval).await;
            file = self.backend.get_file(&file.name).await?;
        }

        match file.state {
            FileState::Failed => Err(LlmError::ProcessingFailed {
                file_name: request.document_id.clone(),
            }
            .into()),
            FileState::StateUnspecified => {
                warn!("⚠️ {} 状态未知，继续尝试生成", file.name);
                Ok(file)
            }
            _ => Ok(file),
        }
    }

    async fn generate_with_retry(
        &self,
        model: &str,
        prompt: &str,
        file: &RemoteFile,
        request: &GradingRequest,
    ) -> AppResult<GradedReport> {
        let max_attempts = self.retry.max_attempts;
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            match self.generate_once(model, prompt, file, request).await {
                Ok(report) => {
                    if attempt > 1 {
                        info!("✓ {} 第 {} 次尝试成功", request.document_id, attempt);
                    }
                    return Ok(report);
                }
                Err(e) => {
                    warn!(
                        "⚠️ {} 第 {}/{} 次评分失败: {}",
                        request.document_id, attempt, max_attempts, e
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        }
        .into())
    }

    async fn generate_once(
        &self,
        model: &str,
        prompt: &str,
        file: &RemoteFile,
        request: &GradingRequest,
    ) -> AppResult<GradedReport> {
        let raw = self
            .backend
            .generate(GenerationRequest {
                model,
                prompt,
                file: Some(file),
                json_output: true,
            })
            .await?;

        debug!("模型原始响应: {}", truncate_text(&raw, 200));

        parse_graded_report(&raw, &request.document_id)
    }
}

/// 解析模型响应为评分记录
pub fn parse_graded_report(raw: &str, document_id: &str) -> AppResult<GradedReport> {
    let cleaned = clean_json_text(raw);
    let response: GradingResponse = serde_json::from_str(&cleaned)
        .map_err(|e| AppError::schema_violation(format!("无法解析评分 JSON: {}", e)))?;
    let report = response.into_report(document_id);
    report.check_schema().map_err(AppError::schema_violation)?;
    Ok(report)
}

/// 构建评分提示词
pub fn build_grading_prompt(rubric_text: &str) -> String {
    format!(
        r#"You are an expert Algebra teacher. Your task is to grade the student's quiz submission (attached PDF) based on the provided rubric.

**Rubric:**
{}

**Instructions:**
1. Analyze the handwritten responses in the PDF.
2. Grade each question according to the rubric.
3. **CRITICAL:** Award partial credit for correct steps or logic, even if the final answer is wrong or if the method differs slightly from the rubric but is mathematically valid.
4. **Feedback Requirement:** For each question, provide a detailed explanation of where exactly points were lost.
5. **Error Identification:** Explicitly point out any specific incorrect algebra, arithmetic errors, or mathematical misconceptions used by the student.
6. Calculate the total score.

**Output Format:**
Return the result as a valid JSON object with the following structure:
{{
    "student_name": "Name found on paper or Filename",
    "quiz_name": "Title of the quiz found on paper or Filename",
    "total_score": <number>,
    "max_score": <number>,
    "questions": [
        {{
            "question_number": <string>,
            "score": <number>,
            "max_points": <number>,
            "feedback": "<string>",
            "partial_credit_awarded": <boolean>
        }}
    ],
    "overall_feedback": "<string>"
}}"#,
        rubric_text
    )
}
