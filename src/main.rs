mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use pdf_quiz::utils::logging;
use pdf_quiz::{Config, QuizPipeline, UsageTracker};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    if let Some(stats_file) = &cli.stats_file {
        config.usage_stats_file = stats_file.clone();
    }
    if cli.verbose {
        config.verbose_chunk_logging = true;
    }

    if let Err(e) = run(&cli, &config).await {
        error!("❌ 处理失败: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    config.require_api_key()?;
    let target = config.check_question_count(cli.num_questions)?;

    let size = tokio::fs::metadata(&cli.pdf)
        .await
        .with_context(|| format!("无法读取文件: {}", cli.pdf.display()))?
        .len();
    config.check_upload(&cli.pdf, size)?;

    logging::log_startup(config, &cli.pdf.display().to_string(), target);
    if !cli.json {
        cli::print_banner(cli);
    }

    let tracker = Arc::new(UsageTracker::from_config(config));
    let pipeline = QuizPipeline::from_config(config, tracker.clone());

    let quiz = pipeline
        .run(&cli.pdf, target)
        .await
        .with_context(|| format!("无法处理 PDF: {}", cli.pdf.display()))?;

    if let Ok(ledger) = tracker.snapshot().await {
        logging::log_usage_summary(&ledger);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&quiz)?);
    } else {
        cli::print_quiz(&quiz);
    }

    if cli.interactive {
        let quiz = Arc::new(quiz);
        tokio::task::spawn_blocking(move || cli::run_interactive(quiz))
            .await
            .context("答题线程异常退出")??;
    }

    Ok(())
}
