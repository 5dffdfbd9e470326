use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use quiz_grader::models::{discover_documents, load_rubric_text};
use quiz_grader::utils::logging::{self, init_log_file, log_startup};
use quiz_grader::utils::to_ndjson_line;
use quiz_grader::{BatchOrchestrator, Config, GeminiClient};

/// 批量批改一个目录中的 PDF 作业
#[derive(Debug, Parser)]
#[command(name = "quiz-grader", version)]
struct Cli {
    /// 待评分 PDF 所在目录
    folder: PathBuf,

    /// 评分标准（纯文本）
    #[arg(long)]
    rubric: PathBuf,

    /// TOML 配置文件
    #[arg(long, env = "QUIZ_GRADER_CONFIG")]
    config: Option<PathBuf>,

    /// 错误概念上报阈值 (0, 1)
    #[arg(long)]
    threshold: Option<f64>,

    /// 结果输出文件（默认写到 stdout）
    #[arg(long)]
    output: Option<PathBuf>,

    /// 详细日志
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref()).context("加载配置失败")?;
    if let Some(threshold) = cli.threshold {
        config.misconception_threshold = threshold;
    }
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);
    config.validate().context("配置无效")?;

    if let Err(e) = init_log_file(&config.output_log_file) {
        warn!("⚠️ 无法创建日志文件: {}", e);
    }
    log_startup(&cli.folder.display().to_string(), config.max_attempts);

    // 加载输入
    let rubric = load_rubric_text(&cli.rubric)
        .await
        .context("读取评分标准失败")?;
    let input = discover_documents(&cli.folder, &rubric)
        .await
        .context("扫描文档目录失败")?;
    if input.documents.is_empty() {
        bail!("No PDF files found in {}", cli.folder.display());
    }

    let backend = Arc::new(GeminiClient::new(&config));
    let orchestrator = BatchOrchestrator::new(backend, config);
    let (results, handle) = orchestrator.run(input);

    let mut out: Box<dyn AsyncWrite + Unpin + Send> = match &cli.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("无法创建输出文件: {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    // 逐条写出结果
    let mut results = Box::pin(results);
    while let Some(result) = results.next().await {
        out.write_all(to_ndjson_line(&result)?.as_bytes()).await?;
        out.flush().await?;
    }

    match handle.wait().await {
        Some(completion) => {
            if let Some(summary) = completion.summary {
                info!(
                    "🧠 班级汇总: {} 条常见错误概念，覆盖 {} 名学生",
                    summary.misconceptions.len(),
                    summary.student_count
                );
            }
        }
        None => warn!("⚠️ 未收到批次完成信息"),
    }

    Ok(())
}
