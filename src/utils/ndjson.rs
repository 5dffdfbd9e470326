//! NDJSON 编码：每条结果一行 JSON，按产生顺序写出

use serde::Serialize;

use crate::error::AppResult;

/// 编码为一行 JSON（以换行结尾）
pub fn to_ndjson_line<T: Serialize>(value: &T) -> AppResult<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}
