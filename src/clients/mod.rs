//! 基础设施层：远端生成模型
//!
//! `GenerativeBackend` 是评分引擎与远端服务之间唯一的接缝，
//! 生产环境使用 `GeminiClient`，测试中替换为脚本化的实现。

pub mod gemini_client;

pub use gemini_client::GeminiClient;

use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 远端文档处理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    StateUnspecified,
}

/// 已上传到远端的文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// 形如 `files/{id}`
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default = "default_state")]
    pub state: FileState,
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

fn default_state() -> FileState {
    FileState::StateUnspecified
}

/// 一次生成调用
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// 附带的文档（可选）
    pub file: Option<&'a RemoteFile>,
    /// 是否强制 JSON 输出
    pub json_output: bool,
}

/// 远端生成模型的能力
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// 列出支持 generateContent 的模型
    async fn list_generation_models(&self) -> AppResult<Vec<String>>;

    /// 上传文档
    async fn upload_document(&self, path: &Path, display_name: &str) -> AppResult<RemoteFile>;

    /// 查询文档处理状态
    async fn get_file(&self, name: &str) -> AppResult<RemoteFile>;

    /// 生成内容，返回原始文本
    async fn generate(&self, request: GenerationRequest<'_>) -> AppResult<String>;
}
