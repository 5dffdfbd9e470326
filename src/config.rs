//! 程序配置
//!
//! 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量

use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 占位符密钥，视为未配置
const PLACEHOLDER_API_KEY: &str = "PASTE_YOUR_KEY_HERE";

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- 模型配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    /// 按优先级排列的模型列表
    pub preferred_models: Vec<String>,
    // --- 评分引擎 ---
    /// 常见错误上报阈值（占全班比例，0~1）
    pub misconception_threshold: f64,
    /// 文档处理状态轮询间隔
    pub poll_interval: Duration,
    /// 重试退避基数（线性：base * attempt）
    pub retry_base_delay: Duration,
    /// 生成 + 解析步骤的最大尝试次数
    pub max_attempts: u32,
    /// 班级汇总时反馈文本的最大字符数
    pub summary_char_budget: usize,
    /// 反馈输出子目录名
    pub feedback_dir_name: String,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            preferred_models: vec![
                "models/gemini-3-pro-preview".to_string(),
                "models/gemini-2.5-pro".to_string(),
                "models/gemini-1.5-pro".to_string(),
                "models/gemini-1.5-flash".to_string(),
            ],
            misconception_threshold: 0.3,
            poll_interval: Duration::from_secs(1),
            retry_base_delay: Duration::from_secs(2),
            max_attempts: 3,
            summary_char_budget: 30_000,
            feedback_dir_name: "feedback".to_string(),
            verbose_logging: false,
            output_log_file: "grading_log.txt".to_string(),
        }
    }
}

/// TOML 配置文件中的可选字段
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    gemini_api_key: Option<String>,
    gemini_api_base_url: Option<String>,
    preferred_models: Option<Vec<String>>,
    misconception_threshold: Option<f64>,
    poll_interval_ms: Option<u64>,
    retry_base_delay_ms: Option<u64>,
    max_attempts: Option<u32>,
    summary_char_budget: Option<usize>,
    feedback_dir_name: Option<String>,
    verbose_logging: Option<bool>,
    output_log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取 TOML 配置文件，再叠加环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            config = config.with_file(path)?;
        }
        Ok(config.with_env_overrides())
    }

    fn with_file(mut self, path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::FileParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;

        if let Some(v) = file.gemini_api_key {
            self.gemini_api_key = v;
        }
        if let Some(v) = file.gemini_api_base_url {
            self.gemini_api_base_url = v;
        }
        if let Some(v) = file.preferred_models {
            self.preferred_models = v;
        }
        if let Some(v) = file.misconception_threshold {
            self.misconception_threshold = v;
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = file.retry_base_delay_ms {
            self.retry_base_delay = Duration::from_millis(v);
        }
        if let Some(v) = file.max_attempts {
            self.max_attempts = v;
        }
        if let Some(v) = file.summary_char_budget {
            self.summary_char_budget = v;
        }
        if let Some(v) = file.feedback_dir_name {
            self.feedback_dir_name = v;
        }
        if let Some(v) = file.verbose_logging {
            self.verbose_logging = v;
        }
        if let Some(v) = file.output_log_file {
            self.output_log_file = v;
        }
        Ok(self)
    }

    fn with_env_overrides(self) -> Self {
        let default = self;
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.gemini_api_base_url),
            preferred_models: std::env::var("PREFERRED_MODELS").ok().map(|v| parse_model_list(&v)).filter(|v| !v.is_empty()).unwrap_or(default.preferred_models),
            misconception_threshold: std::env::var("MISCONCEPTION_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.misconception_threshold),
            poll_interval: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).map(Duration::from_millis).unwrap_or(default.poll_interval),
            retry_base_delay: std::env::var("RETRY_BASE_DELAY_MS").ok().and_then(|v| v.parse().ok()).map(Duration::from_millis).unwrap_or(default.retry_base_delay),
            max_attempts: std::env::var("MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_attempts),
            summary_char_budget: std::env::var("SUMMARY_CHAR_BUDGET").ok().and_then(|v| v.parse().ok()).unwrap_or(default.summary_char_budget),
            feedback_dir_name: std::env::var("FEEDBACK_DIR").unwrap_or(default.feedback_dir_name),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        let key = self.gemini_api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::MissingApiKey {
                var_name: "GEMINI_API_KEY".to_string(),
            }
            .into());
        }

        let t = self.misconception_threshold;
        if !(t > 0.0 && t < 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "misconception_threshold".to_string(),
                value: t.to_string(),
                expected: "(0, 1) 之间的小数".to_string(),
            }
            .into());
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_attempts".to_string(),
                value: "0".to_string(),
                expected: "至少为 1".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
