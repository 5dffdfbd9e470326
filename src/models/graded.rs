//! 评分结果数据模型
//!
//! 成功与失败是两个互斥的变体，永远不会出现字段混合的结果。

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// 单题评分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    #[serde(deserialize_with = "deserialize_question_number")]
    pub question_number: String,
    pub score: f64,
    pub max_points: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub partial_credit_awarded: bool,
}

/// 成功评分的完整记录
///
/// 同时也是缓存文件的格式。`document_id` 以 `filename` 字段输出。
/// 反序列化是宽松的，只用于读取缓存；模型输出走 `GradingResponse`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedReport {
    pub student_name: String,
    #[serde(default)]
    pub quiz_name: String,
    pub total_score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub questions: Vec<QuestionResult>,
    #[serde(default)]
    pub overall_feedback: String,
    #[serde(rename = "filename", default)]
    pub document_id: String,
}

impl GradedReport {
    /// 得分百分比；满分为 0 时返回 None
    pub fn percentage(&self) -> Option<f64> {
        if self.max_score > 0.0 {
            Some(self.total_score / self.max_score * 100.0)
        } else {
            None
        }
    }

    /// 检查模型输出是否满足 schema 中 serde 无法表达的约束
    pub fn check_schema(&self) -> Result<(), String> {
        if !self.total_score.is_finite() || !self.max_score.is_finite() {
            return Err("total_score / max_score 必须是有限数值".to_string());
        }
        if let Some(q) = self
            .questions
            .iter()
            .find(|q| !q.score.is_finite() || !q.max_points.is_finite())
        {
            return Err(format!("题目 {} 的分数不是有限数值", q.question_number));
        }
        Ok(())
    }
}

/// 模型返回的单题评分，所有字段必填
#[derive(Debug, Deserialize)]
pub struct QuestionResponse {
    #[serde(deserialize_with = "deserialize_question_number")]
    pub question_number: String,
    pub score: f64,
    pub max_points: f64,
    pub feedback: String,
    pub partial_credit_awarded: bool,
}

/// 模型返回的评分
///
/// 缺少任何字段都是 schema 违规，会触发重试，不会被当作成功写入缓存。
#[derive(Debug, Deserialize)]
pub struct GradingResponse {
    pub student_name: String,
    pub quiz_name: String,
    pub total_score: f64,
    pub max_score: f64,
    pub questions: Vec<QuestionResponse>,
    pub overall_feedback: String,
}

impl GradingResponse {
    pub fn into_report(self, document_id: impl Into<String>) -> GradedReport {
        GradedReport {
            student_name: self.student_name,
            quiz_name: self.quiz_name,
            total_score: self.total_score,
            max_score: self.max_score,
            questions: self
                .questions
                .into_iter()
                .map(|q| QuestionResult {
                    question_number: q.question_number,
                    score: q.score,
                    max_points: q.max_points,
                    feedback: q.feedback,
                    partial_credit_awarded: q.partial_credit_awarded,
                })
                .collect(),
            overall_feedback: self.overall_feedback,
            document_id: document_id.into(),
        }
    }
}

/// 评分失败记录
#[derive(Debug, Clone, PartialEq)]
pub struct GradingFailure {
    pub document_id: String,
    pub error: String,
}

impl Serialize for GradingFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GradingFailure", 3)?;
        state.serialize_field("error", &self.error)?;
        state.serialize_field("file", &self.document_id)?;
        state.serialize_field("filename", &self.document_id)?;
        state.end()
    }
}

/// 单个文档的评分结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GradedResult {
    Graded(GradedReport),
    Failed(GradingFailure),
}

impl GradedResult {
    pub fn failure(document_id: impl Into<String>, error: impl Into<String>) -> Self {
        GradedResult::Failed(GradingFailure {
            document_id: document_id.into(),
            error: error.into(),
        })
    }

    pub fn document_id(&self) -> &str {
        match self {
            GradedResult::Graded(report) => &report.document_id,
            GradedResult::Failed(failure) => &failure.document_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GradedResult::Failed(_))
    }

    pub fn as_report(&self) -> Option<&GradedReport> {
        match self {
            GradedResult::Graded(report) => Some(report),
            GradedResult::Failed(_) => None,
        }
    }
}

// 题号既可能是字符串也可能是数字
fn deserialize_question_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct QuestionNumberVisitor;

    impl<'de> Visitor<'de> for QuestionNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or number identifying a question")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(QuestionNumberVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_record_without_optional_fields() {
        let raw = r#"{"student_name":"A","total_score":8,"max_score":10,"questions":[],"overall_feedback":"ok"}"#;
        let report: GradedReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.student_name, "A");
        assert_eq!(report.total_score, 8.0);
        assert!(report.quiz_name.is_empty());
        assert_eq!(report.percentage(), Some(80.0));
    }

    #[test]
    fn test_question_number_accepts_numbers() {
        let q: QuestionResult = serde_json::from_value(json!({
            "question_number": 3,
            "score": 1.5,
            "max_points": 2,
            "feedback": "sign error"
        }))
        .unwrap();
        assert_eq!(q.question_number, "3");
        assert!(!q.partial_credit_awarded);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result = serde_json::from_str::<GradedReport>(r#"{"student_name":"A"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_success_envelope_injects_filename() {
        let result = GradedResult::Graded(GradedReport {
            student_name: "A".to_string(),
            quiz_name: String::new(),
            total_score: 8.0,
            max_score: 10.0,
            questions: vec![],
            overall_feedback: "ok".to_string(),
            document_id: "a.pdf".to_string(),
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["filename"], "a.pdf");
        assert_eq!(value["student_name"], "A");
        assert_eq!(value["quiz_name"], "");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_grading_response_requires_every_field() {
        let partial = r#"{"student_name":"A","total_score":1,"max_score":2}"#;
        assert!(serde_json::from_str::<GradingResponse>(partial).is_err());

        let no_credit_flag = json!({
            "student_name": "A",
            "quiz_name": "Q",
            "total_score": 1,
            "max_score": 2,
            "questions": [{ "question_number": "1", "score": 1, "max_points": 2, "feedback": "ok" }],
            "overall_feedback": "fine"
        });
        assert!(serde_json::from_value::<GradingResponse>(no_credit_flag).is_err());
    }

    #[test]
    fn test_grading_response_into_report() {
        let response: GradingResponse = serde_json::from_value(json!({
            "student_name": "A",
            "quiz_name": "Q",
            "total_score": 1,
            "max_score": 2,
            "questions": [{ "question_number": 1, "score": 1, "max_points": 2, "feedback": "ok", "partial_credit_awarded": true }],
            "overall_feedback": "fine"
        }))
        .unwrap();
        let report = response.into_report("a.pdf");
        assert_eq!(report.document_id, "a.pdf");
        assert_eq!(report.questions[0].question_number, "1");
        assert!(report.questions[0].partial_credit_awarded);
    }

    #[test]
    fn test_failure_envelope() {
        let result = GradedResult::failure("b.pdf", "文档处理失败");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"error": "文档处理失败", "file": "b.pdf", "filename": "b.pdf"})
        );
        assert!(result.is_error());
        assert_eq!(result.document_id(), "b.pdf");
    }

    #[test]
    fn test_check_schema_rejects_non_finite() {
        let mut report: GradedReport =
            serde_json::from_str(r#"{"student_name":"A","total_score":1,"max_score":2}"#).unwrap();
        assert!(report.check_schema().is_ok());
        report.max_score = f64::NAN;
        assert!(report.check_schema().is_err());
    }
}
