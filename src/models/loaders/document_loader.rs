use crate::error::{AppError, AppResult, FileError};
use crate::models::document::{BatchInput, GradingRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// 读取评分标准文本
///
/// 只支持纯文本；`.pdf` / `.docx` 的文本提取由外部组件负责。
pub async fn load_rubric_text(rubric_path: &Path) -> AppResult<String> {
    if !rubric_path.exists() {
        return Err(FileError::NotFound {
            path: rubric_path.display().to_string(),
        }
        .into());
    }

    let ext = extension_lowercase(rubric_path);
    if matches!(ext.as_deref(), Some("pdf") | Some("docx")) {
        return Err(FileError::UnsupportedFormat {
            path: rubric_path.display().to_string(),
        }
        .into());
    }

    let bytes = fs::read(rubric_path)
        .await
        .map_err(|e| AppError::file_read_failed(rubric_path.display().to_string(), e))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 扫描文件夹中的所有 PDF，按文件名排序
pub async fn discover_documents(folder_path: &Path, rubric_text: &str) -> AppResult<BatchInput> {
    if !folder_path.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.display().to_string(),
        }
        .into());
    }

    let mut pdf_files: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path.display().to_string(), e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && extension_lowercase(&path).as_deref() == Some("pdf") {
            tracing::debug!(
                "发现文档: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
            pdf_files.push(path);
        }
    }

    pdf_files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let rubric: Arc<str> = Arc::from(rubric_text);
    let documents = pdf_files
        .into_iter()
        .map(|path| GradingRequest::new(path, Arc::clone(&rubric)))
        .collect();

    Ok(BatchInput {
        folder: folder_path.to_path_buf(),
        documents,
    })
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discover_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["C.pdf", "A.pdf", "B.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(dir.path().join("feedback")).unwrap();

        let batch = discover_documents(dir.path(), "rubric").await.unwrap();
        let ids: Vec<&str> = batch
            .documents
            .iter()
            .map(|d| d.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A.pdf", "B.PDF", "C.pdf"]);
        assert_eq!(&*batch.documents[0].rubric_text, "rubric");
    }

    #[tokio::test]
    async fn test_discover_missing_folder() {
        let result = discover_documents(Path::new("/definitely/not/here"), "").await;
        assert!(matches!(
            result,
            Err(AppError::File(FileError::DirectoryNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_rubric_formats() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("rubric.txt");
        std::fs::write(&txt, "Q1: 2 points").unwrap();
        assert_eq!(load_rubric_text(&txt).await.unwrap(), "Q1: 2 points");

        let docx = dir.path().join("rubric.docx");
        std::fs::write(&docx, b"PK").unwrap();
        assert!(matches!(
            load_rubric_text(&docx).await,
            Err(AppError::File(FileError::UnsupportedFormat { .. }))
        ));
    }
}
