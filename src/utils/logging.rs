/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::UsageLedger;

/// 初始化日志输出
///
/// 默认级别为 `info`，可通过 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, pdf_path: &str, num_questions: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - PDF 选择题生成");
    info!("📄 PDF: {}", pdf_path);
    info!("❓ 题目数量: {}", num_questions);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
///
/// # 参数
/// - `text_length`: 全文字符数
/// - `chunk_count`: 分块数
/// - `target`: 目标题数
pub fn log_document_loaded(text_length: usize, chunk_count: usize, target: usize) {
    info!("✓ 文本长度 {} 字符，共 {} 个分块", text_length, chunk_count);
    info!("📋 目标生成 {} 道题\n", target);
}

/// 记录单个分块开始处理
pub fn log_chunk_start(chunk_index: usize, chunk_count: usize, requested: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "📦 处理分块 {}/{}，请求 {} 道题",
        chunk_index + 1,
        chunk_count,
        requested
    );
}

/// 打印流水线统计
///
/// # 参数
/// - `processed`: 成功出题的分块数
/// - `empty`: 没有出题的分块数
/// - `skipped`: 因已达到目标而跳过的分块数
/// - `generated`: 最终题数
/// - `target`: 目标题数
pub fn log_pipeline_complete(
    processed: usize,
    empty: usize,
    skipped: usize,
    generated: usize,
    target: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 生成题目: {}/{}", generated, target);
    info!("📦 分块: 成功 {}, 无结果 {}, 跳过 {}", processed, empty, skipped);
    info!("{}", "=".repeat(60));
}

/// 打印累计用量
pub fn log_usage_summary(ledger: &UsageLedger) {
    info!(
        "💰 累计: {} 份文档, {} 次调用, {} tokens, 约 ${:.4} (平均每份 ${:.4})",
        ledger.total_documents_processed,
        ledger.total_api_calls,
        ledger.tokens.total,
        ledger.costs.total_usd_est,
        ledger.costs.avg_cost_per_doc
    );
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max_len {
        flat.chars().take(max_len).collect::<String>() + "..."
    } else {
        flat
    }
}
