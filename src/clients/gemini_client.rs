/// Gemini REST 客户端
///
/// 封装模型发现、文档上传、状态查询和内容生成四个调用
use crate::clients::{GenerationRequest, GenerativeBackend, RemoteFile};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, LlmError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, warn};

const API_VERSION: &str = "v1beta";
const GENERATE_METHOD: &str = "generateContent";

/// Gemini 客户端
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// 上传接口可能返回 `{"file": {...}}` 或直接返回文件对象
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadResponse {
    Wrapped { file: RemoteFile },
    Bare(RemoteFile),
}

impl GeminiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.gemini_api_key, &config.gemini_api_base_url)
    }

    /// 使用自定义端点创建客户端
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, path)
    }

    /// 模型名统一为 `models/xxx`
    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn build_generate_body(request: &GenerationRequest<'_>) -> Value {
        let mut parts = Vec::new();
        if let Some(file) = request.file {
            parts.push(json!({
                "fileData": {
                    "mimeType": file.mime_type,
                    "fileUri": file.uri,
                }
            }));
        }
        parts.push(json!({ "text": request.prompt }));

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if request.json_output {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }
        body
    }

    /// 从 generateContent 响应中取出文本
    fn extract_text(model: &str, response: &Value) -> AppResult<String> {
        if let Some(reason) = response
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(AppError::llm_api_failed(
                model,
                std::io::Error::other(format!("请求被拦截: {}", reason)),
            ));
        }

        let text: String = response
            .pointer("/candidates/0/content/parts")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent {
                model: model.to_string(),
            }
            .into());
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn list_generation_models(&self) -> AppResult<Vec<String>> {
        let endpoint = self.api_url("models");
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&endpoint)
                .query(&[("key", self.api_key.as_str()), ("pageSize", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::api_request_failed("models.list", e))?;
            let page: ModelListResponse = check_status(response, "models.list")
                .await?
                .json()
                .await?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| {
                        m.supported_generation_methods
                            .iter()
                            .any(|method| method == GENERATE_METHOD)
                    })
                    .map(|m| m.name),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("可用模型 {} 个", models.len());
        Ok(models)
    }

    async fn upload_document(&self, path: &Path, display_name: &str) -> AppResult<RemoteFile> {
        debug!("上传文档: {}", path.display());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        let metadata = json!({ "file": { "display_name": display_name } }).to_string();
        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata)
                    .mime_str("application/json")
                    .map_err(|e| AppError::api_request_failed("files.upload", e))?,
            )
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(display_name.to_string())
                    .mime_str("application/pdf")
                    .map_err(|e| AppError::api_request_failed("files.upload", e))?,
            );

        let url = format!("{}/upload/{}/files", self.base_url, API_VERSION);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "multipart")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed("files.upload", e))?;

        let uploaded: UploadResponse = check_status(response, "files.upload").await?.json().await?;
        let file = match uploaded {
            UploadResponse::Wrapped { file } | UploadResponse::Bare(file) => file,
        };

        debug!("上传完成: {} ({:?})", file.name, file.state);
        Ok(file)
    }

    async fn get_file(&self, name: &str) -> AppResult<RemoteFile> {
        let response = self
            .http
            .get(self.api_url(name))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::api_request_failed("files.get", e))?;

        let file: RemoteFile = check_status(response, "files.get").await?.json().await?;
        Ok(file)
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> AppResult<String> {
        let model_path = Self::model_path(request.model);
        debug!("调用模型: {}", model_path);

        let url = self.api_url(&format!("{}:{}", model_path, GENERATE_METHOD));
        let body = Self::build_generate_body(&request);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::llm_api_failed(&model_path, e))?;

        let payload: Value = check_status(response, GENERATE_METHOD).await?.json().await?;
        Self::extract_text(&model_path, &payload)
    }
}

/// 非 2xx 响应转换为 ApiError
async fn check_status(response: Response, endpoint: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!("{} 返回 {}: {}", endpoint, status, message);

    let err = if status.as_u16() == 429 {
        ApiError::RateLimited {
            endpoint: endpoint.to_string(),
            message,
        }
    } else {
        ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        }
    };
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::FileState;

    #[test]
    fn test_model_path() {
        assert_eq!(GeminiClient::model_path("gemini-1.5-pro"), "models/gemini-1.5-pro");
        assert_eq!(GeminiClient::model_path("models/gemini-1.5-pro"), "models/gemini-1.5-pro");
    }

    #[test]
    fn test_generate_body_with_file() {
        let file = RemoteFile {
            name: "files/abc".to_string(),
            uri: "https://example.test/files/abc".to_string(),
            mime_type: "application/pdf".to_string(),
            state: FileState::Active,
        };
        let request = GenerationRequest {
            model: "models/gemini-1.5-pro",
            prompt: "grade",
            file: Some(&file),
            json_output: true,
        };
        let body = GeminiClient::build_generate_body(&request);
        assert_eq!(
            body.pointer("/contents/0/parts/0/fileData/fileUri").unwrap(),
            "https://example.test/files/abc"
        );
        assert_eq!(body.pointer("/contents/0/parts/1/text").unwrap(), "grade");
        assert_eq!(
            body.pointer("/generationConfig/responseMimeType").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(GeminiClient::extract_text("m", &response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_extract_text_blocked_or_empty() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(GeminiClient::extract_text("m", &blocked).is_err());

        let empty = json!({ "candidates": [] });
        assert!(matches!(
            GeminiClient::extract_text("m", &empty),
            Err(AppError::Llm(LlmError::EmptyContent { .. }))
        ));
    }

    #[test]
    fn test_remote_file_state_parsing() {
        let file: RemoteFile =
            serde_json::from_str(r#"{"name":"files/x","state":"PROCESSING"}"#).unwrap();
        assert_eq!(file.state, FileState::Processing);
        let file: RemoteFile =
            serde_json::from_str(r#"{"name":"files/x","state":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(file.state, FileState::StateUnspecified);
    }
}
