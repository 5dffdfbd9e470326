use crate::error::{AppError, AppResult};
use crate::orchestrator::BatchStats;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则默认 `info`，开启详细日志时为 `debug`。
/// 日志写到 stderr，stdout 留给结果流。重复调用是安全的。
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n作业评分日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `folder`: 输入目录
/// - `max_attempts`: 单个文档最大尝试次数
pub fn log_startup(folder: &str, max_attempts: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评分模式");
    info!("📁 输入目录: {}", folder);
    info!("🔁 单个文档最多尝试 {} 次", max_attempts);
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
///
/// # 参数
/// - `total`: 文档总数
/// - `feedback_dir`: 反馈目录
pub fn log_documents_loaded(total: usize, feedback_dir: &str) {
    info!("✓ 找到 {} 个待评分的文档", total);
    info!("💾 评分记录保存在: {}", feedback_dir);
    info!("💡 已有记录的文档会直接复用\n");
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 批次统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &BatchStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部评分完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 新评分: {}", stats.graded);
    info!("♻️ 复用记录: {}", stats.cached);
    info!("❌ 失败: {}", stats.failed);
    match stats.average_percentage {
        Some(avg) => info!("📈 平均得分率: {:.1}%", avg),
        None => info!("📈 平均得分率: -"),
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
