//! 结果缓存 - 业务能力层
//!
//! 每个成功评分的文档对应反馈目录下的一个 JSON 文件。
//! 文件存在且可解析即视为已完成，后续运行直接复用，不再调用模型。
//! 只接受 `GradedReport`，失败结果无法写入，下次运行总会重试。

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::GradedReport;

/// 缓存文件后缀
pub const CACHE_SUFFIX: &str = "_result.json";

/// 结果缓存
///
/// 职责：
/// - 按文档名读写缓存记录
/// - 读取失败一律视为未命中
/// - 不关心评分流程
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// 使用指定目录创建
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 批处理目录下的反馈子目录
    pub fn for_batch(folder: &Path, feedback_dir_name: &str) -> Self {
        Self::new(folder.join(feedback_dir_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 缓存文件路径：`{完整文档名}_result.json`
    ///
    /// 保留扩展名，`a.pdf` 与 `a.PDF` 各有一份记录。
    pub fn record_path(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", document_id, CACHE_SUFFIX))
    }

    /// 读取缓存记录
    ///
    /// # 返回
    /// 命中返回记录；文件不存在、读取失败或内容无效时返回 None
    pub async fn load(&self, document_id: &str) -> Option<GradedReport> {
        let path = self.record_path(document_id);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("⚠️ 读取缓存失败 {}: {}，重新评分", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<GradedReport>(&content) {
            Ok(mut report) => {
                debug!("缓存命中: {}", path.display());
                report.document_id = document_id.to_string();
                Some(report)
            }
            Err(e) => {
                warn!("⚠️ 缓存内容无效 {}: {}，重新评分", path.display(), e);
                None
            }
        }
    }

    /// 写入缓存记录
    ///
    /// 先写临时文件再改名，中途中断不会留下半个记录。
    pub async fn save(&self, report: &GradedReport) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.dir.display().to_string(), e))?;

        let path = self.record_path(&report.document_id);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(report)?;

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("已写入缓存: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(document_id: &str) -> GradedReport {
        GradedReport {
            student_name: "A".to_string(),
            quiz_name: "Quiz".to_string(),
            total_score: 8.0,
            max_score: 10.0,
            questions: vec![],
            overall_feedback: "ok".to_string(),
            document_id: document_id.to_string(),
        }
    }

    #[test]
    fn test_record_path_keeps_extension() {
        let cache = ResultCache::for_batch(Path::new("/tmp/batch"), "feedback");
        assert_eq!(
            cache.record_path("alice.pdf"),
            PathBuf::from("/tmp/batch/feedback/alice.pdf_result.json")
        );
        assert_ne!(cache.record_path("a.pdf"), cache.record_path("a.PDF"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::for_batch(dir.path(), "feedback");

        assert!(cache.load("alice.pdf").await.is_none());

        cache.save(&report("alice.pdf")).await.unwrap();
        let loaded = cache.load("alice.pdf").await.unwrap();
        assert_eq!(loaded, report("alice.pdf"));
        assert!(!cache.record_path("alice.pdf").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path());
        std::fs::write(cache.record_path("bob.pdf"), "{ not json").unwrap();
        assert!(cache.load("bob.pdf").await.is_none());

        // 失败记录的格式也不会被当作成功
        std::fs::write(
            cache.record_path("bob.pdf"),
            r#"{"error":"boom","file":"bob.pdf"}"#,
        )
        .unwrap();
        assert!(cache.load("bob.pdf").await.is_none());
    }
}
