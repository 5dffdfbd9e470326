//! 测试用的脚本化后端
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use quiz_grader::clients::{FileState, GenerationRequest, GenerativeBackend, RemoteFile};
use quiz_grader::{AppError, AppResult, Config};

pub const SUMMARY_RESPONSE: &str = "\
**Common Misconceptions**
* Sign errors when moving terms
* Distributing exponents over addition
* Confusing area and perimeter

**Problem Areas**
Factoring quadratics.

**Recommendations**
1. Review sign rules
2. Practice factoring
";

/// 零等待的测试配置
pub fn test_config() -> Config {
    Config {
        gemini_api_key: "test-key".to_string(),
        poll_interval: Duration::ZERO,
        retry_base_delay: Duration::ZERO,
        ..Config::default()
    }
}

/// 以文件名为学生名的合法评分 JSON
pub fn report_json(student: &str) -> String {
    format!(
        r#"{{"student_name":"{}","quiz_name":"Quiz 1","total_score":7,"max_score":10,"questions":[{{"question_number":1,"score":7,"max_points":10,"feedback":"Dropped a sign in step 2","partial_credit_awarded":true}}],"overall_feedback":"Solid work"}}"#,
        student
    )
}

/// 脚本化后端
///
/// - 上传返回 `files/{文件名}`，状态为 `upload_state`；设置 `upload_error` 时上传报错
/// - 设置 `poll_error` 时查询文件状态报错
/// - 每份文档先经历 `processing_polls` 次 PROCESSING 再变为 ACTIVE
/// - 评分调用依次取 `grade_script`，取完后返回以文件名为学生名的合法结果
/// - 非 JSON 调用返回 `summary_response`
pub struct MockBackend {
    pub models: AppResult<Vec<String>>,
    pub upload_state: FileState,
    pub processing_polls: usize,
    pub upload_error: Option<String>,
    pub poll_error: Option<String>,
    pub grade_script: Mutex<VecDeque<AppResult<String>>>,
    pub summary_response: AppResult<String>,

    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub grade_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub uploaded: Mutex<Vec<String>>,
    pub used_models: Mutex<Vec<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            models: Ok(vec!["models/gemini-1.5-pro".to_string()]),
            upload_state: FileState::Active,
            processing_polls: 0,
            upload_error: None,
            poll_error: None,
            grade_script: Mutex::new(VecDeque::new()),
            summary_response: Ok(SUMMARY_RESPONSE.to_string()),
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            grade_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
            used_models: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn with_grade_script(script: Vec<AppResult<String>>) -> Self {
        Self {
            grade_script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub fn scripted_error(message: &str) -> AppError {
    AppError::Other(message.to_string())
}

fn clone_result<T: Clone>(result: &AppResult<T>) -> AppResult<T> {
    match result {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(AppError::Other(e.to_string())),
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn list_generation_models(&self) -> AppResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        clone_result(&self.models)
    }

    async fn upload_document(&self, _path: &Path, display_name: &str) -> AppResult<RemoteFile> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().unwrap().push(display_name.to_string());
        if let Some(message) = &self.upload_error {
            return Err(scripted_error(message));
        }

        let state = if self.processing_polls > 0 {
            FileState::Processing
        } else {
            self.upload_state.clone()
        };
        Ok(RemoteFile {
            name: format!("files/{}", display_name),
            uri: format!("mock://files/{}", display_name),
            mime_type: "application/pdf".to_string(),
            state,
        })
    }

    async fn get_file(&self, name: &str) -> AppResult<RemoteFile> {
        let polls = self.get_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = &self.poll_error {
            return Err(scripted_error(message));
        }
        let state = if polls < self.processing_polls {
            FileState::Processing
        } else {
            self.upload_state.clone()
        };
        Ok(RemoteFile {
            name: name.to_string(),
            uri: format!("mock://{}", name),
            mime_type: "application/pdf".to_string(),
            state,
        })
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> AppResult<String> {
        self.used_models
            .lock()
            .unwrap()
            .push(request.model.to_string());

        if !request.json_output {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            return clone_result(&self.summary_response);
        }

        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.grade_script.lock().unwrap().pop_front() {
            return next;
        }

        let student = request
            .file
            .and_then(|f| f.name.strip_prefix("files/"))
            .and_then(|n| n.strip_suffix(".pdf"))
            .unwrap_or("Student");
        Ok(report_json(student))
    }
}

/// 在目录中创建若干空 PDF 文件
pub fn touch_pdfs(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
    }
}
