//! 文档处理上下文
//!
//! 封装"我正在处理第几份文档"这一信息

use std::fmt::Display;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 文档序号（从1开始，仅用于日志显示）
    pub document_index: usize,

    /// 本批次文档总数
    pub total: usize,

    /// 文档名
    pub document_id: String,
}

impl DocumentCtx {
    pub fn new(document_index: usize, total: usize, document_id: impl Into<String>) -> Self {
        Self {
            document_index,
            total,
            document_id: document_id.into(),
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {}/{} {}]",
            self.document_index, self.total, self.document_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = DocumentCtx::new(2, 5, "bo.pdf");
        assert_eq!(ctx.to_string(), "[文档 2/5 bo.pdf]");
    }
}
