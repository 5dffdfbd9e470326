//! 响应清洗 - 业务能力层
//!
//! - `clean_json_text`：去掉模型回复外层的代码块围栏，得到可直接解析的 JSON 文本
//! - `delatex`：把数学 LaTeX 标记转换成普通 Unicode 文本，用于报告与汇总
//!
//! 两个函数都是全函数：任何输入都返回字符串，不会失败。

use phf::phf_map;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `\frac{A}{B}`，只匹配不含花括号的最内层
static FRAC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\frac\s*\{([^{}]*)\}\s*\{([^{}]*)\}").expect("valid frac regex"));

/// `^\circ` / `^{\circ}`
static DEGREE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\s*\{?\s*\\circ\s*\}?").expect("valid degree regex"));

/// `^{-1}` / `^-1`
static INVERSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\s*\{\s*-\s*1\s*\}|\^-1").expect("valid inverse regex"));

/// `^2` / `^{2}` / `^3` / `^{3}`
static SQUARE_CUBE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\s*(?:\{\s*([23])\s*\}|([23]))").expect("valid power regex"));

/// `\command`
static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)").expect("valid command regex"));

/// LaTeX 命令 → Unicode
static SYMBOLS: phf::Map<&'static str, &'static str> = phf_map! {
    "times" => "×",
    "cdot" => "·",
    "div" => "÷",
    "pm" => "±",
    "le" => "≤",
    "leq" => "≤",
    "ge" => "≥",
    "geq" => "≥",
    "ne" => "≠",
    "neq" => "≠",
    "approx" => "≈",
    "infty" => "∞",
    "pi" => "π",
    "theta" => "θ",
    "alpha" => "α",
    "beta" => "β",
    "Delta" => "Δ",
    "sqrt" => "√",
    "circ" => "°",
    "left" => "",
    "right" => "",
    "text" => "",
    "mathrm" => "",
};

/// 去掉 ```json / ``` 围栏并去除首尾空白
///
/// 幂等：对结果再次调用得到相同结果。
pub fn clean_json_text(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

/// 把 LaTeX 数学标记转换为纯文本
pub fn delatex(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // 由内向外展开 \frac；每轮至少消去一个 \frac，没有匹配即停止
    let mut out = text.to_string();
    while FRAC_RE.is_match(&out) {
        out = FRAC_RE.replace_all(&out, "($1)/($2)").into_owned();
    }

    let out = DEGREE_RE.replace_all(&out, "°");
    let out = INVERSE_RE.replace_all(&out, "^(-1)");
    let out = SQUARE_CUBE_RE.replace_all(&out, |caps: &Captures| {
        let digit = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        if digit == "2" { "²" } else { "³" }
    });
    let out = COMMAND_RE.replace_all(&out, |caps: &Captures| {
        SYMBOLS
            .get(&caps[1])
            .map_or_else(|| caps[1].to_string(), |s| s.to_string())
    });

    out.chars()
        .filter(|c| !matches!(c, '$' | '\\' | '{' | '}'))
        .collect()
}
