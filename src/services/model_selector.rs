//! 模型选择 - 业务能力层
//!
//! 三级回退，永远返回一个模型名：
//! 1. 偏好列表中第一个可用的模型
//! 2. 可用列表中第一个"看起来像"新一代通用生成模型的模型（启发式，见 `looks_general_purpose`）
//! 3. 硬编码的历史可用模型
//!
//! 模型是否真的可用，留给第一次调用去发现。

use crate::clients::GenerativeBackend;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// 最后兜底的模型
pub const FALLBACK_MODEL: &str = "models/gemini-1.5-flash";

/// 旧代模型的名称片段
const LEGACY_MARKERS: &[&str] = &["gemini-1.0", "gemini-pro"];

/// 非通用生成模型（仅视觉 / 向量 / 问答）的名称片段
const SPECIALIZED_MARKERS: &[&str] = &["vision", "embedding", "aqa", "imagen", "tts"];

/// 启发式判断：名称包含 `gemini`，且不含旧代或专用模型的名称片段
///
/// `gemini-pro` 只匹配旧代的 `gemini-pro` 本身（如 `models/gemini-pro`、
/// `models/gemini-pro-vision`），不会误伤 `gemini-1.5-pro` 这类名称。
pub fn looks_general_purpose(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model).to_ascii_lowercase();
    name.contains("gemini")
        && !LEGACY_MARKERS.iter().any(|m| name.starts_with(m))
        && !SPECIALIZED_MARKERS.iter().any(|m| name.contains(m))
}

/// 从可用模型中选择一个
///
/// # 参数
/// - `available`: 账号当前可用的模型（支持 generateContent）
/// - `preferred`: 按优先级排列的模型
///
/// # 返回
/// 选中的模型名，不会失败
pub fn select_model(available: &[String], preferred: &[String]) -> String {
    if let Some(model) = preferred.iter().find(|p| available.contains(p)) {
        return model.clone();
    }

    if let Some(model) = available.iter().find(|m| looks_general_purpose(m)) {
        return model.clone();
    }

    FALLBACK_MODEL.to_string()
}

/// 每次批处理内只做一次模型发现和选择
pub struct ModelResolver {
    preferred: Vec<String>,
    selected: OnceCell<String>,
}

impl ModelResolver {
    pub fn new(preferred: Vec<String>) -> Self {
        Self {
            preferred,
            selected: OnceCell::new(),
        }
    }

    /// 获取本批次使用的模型
    ///
    /// 模型发现失败时按空列表处理，落到兜底模型。
    pub async fn resolve<B>(&self, backend: &B) -> &str
    where
        B: GenerativeBackend + ?Sized,
    {
        self.selected
            .get_or_init(|| async {
                let available = match backend.list_generation_models().await {
                    Ok(models) => models,
                    Err(e) => {
                        warn!("⚠️ 获取模型列表失败，使用兜底模型: {}", e);
                        Vec::new()
                    }
                };
                let model = select_model(&available, &self.preferred);
                info!("🤖 选择模型: {}", model);
                model
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preferred_match_wins() {
        let available = strings(&["models/gemini-1.5-pro"]);
        let preferred = strings(&["models/gemini-3-pro-preview", "models/gemini-1.5-pro"]);
        assert_eq!(select_model(&available, &preferred), "models/gemini-1.5-pro");
    }

    #[test]
    fn test_preference_order_not_listing_order() {
        let available = strings(&["models/gemini-1.5-flash", "models/gemini-1.5-pro"]);
        let preferred = strings(&["models/gemini-1.5-pro", "models/gemini-1.5-flash"]);
        assert_eq!(select_model(&available, &preferred), "models/gemini-1.5-pro");
    }

    #[test]
    fn test_empty_available_uses_fallback() {
        let preferred = strings(&["models/gemini-3-pro-preview"]);
        assert_eq!(select_model(&[], &preferred), FALLBACK_MODEL);
        assert_eq!(select_model(&[], &[]), FALLBACK_MODEL);
    }

    #[test]
    fn test_heuristic_skips_legacy_and_vision() {
        let available = strings(&[
            "models/gemini-pro-vision",
            "models/gemini-pro",
            "models/text-embedding-004",
            "models/gemini-2.0-flash",
        ]);
        assert_eq!(select_model(&available, &[]), "models/gemini-2.0-flash");
    }

    #[test]
    fn test_no_heuristic_match_uses_fallback() {
        let available = strings(&["models/gemini-pro-vision", "models/chat-bison-001"]);
        assert_eq!(select_model(&available, &[]), FALLBACK_MODEL);
    }

    #[test]
    fn test_looks_general_purpose() {
        assert!(looks_general_purpose("models/gemini-1.5-pro"));
        assert!(looks_general_purpose("gemini-2.5-flash"));
        assert!(!looks_general_purpose("models/gemini-1.0-pro"));
        assert!(!looks_general_purpose("models/embedding-gecko"));
    }
}
