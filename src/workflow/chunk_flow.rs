//! 分块处理流程 - 流程层
//!
//! 定义"一个分块"的完整处理流程：出题 → 记录用量。
//! 不关心配额怎么分，也不决定何时停止。

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{Chunk, Question};
use crate::services::{QuestionGenerator, UsageTracker};
use crate::utils::logging::truncate_text;
use crate::workflow::chunk_ctx::ChunkCtx;

/// 分块处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 生成了至少一道题
    Success,
    /// 没有生成题目（模型失败或输出被拒绝）
    Empty,
}

pub struct ChunkFlow {
    generator: QuestionGenerator,
    tracker: Arc<UsageTracker>,
    verbose_logging: bool,
}

impl ChunkFlow {
    pub fn new(generator: QuestionGenerator, tracker: Arc<UsageTracker>) -> Self {
        Self {
            generator,
            tracker,
            verbose_logging: false,
        }
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    pub async fn run(&self, chunk: &Chunk, ctx: &ChunkCtx) -> (ProcessResult, Vec<Question>) {
        if self.verbose_logging {
            info!(
                "{} {} 字符: {}",
                ctx,
                chunk.char_len(),
                truncate_text(chunk.text(), 80)
            );
        }

        let result = self.generator.generate(chunk.text(), ctx.requested).await;

        self.tracker
            .record(result.usage.input_tokens, result.usage.output_tokens, false)
            .await;

        if result.questions.is_empty() {
            warn!("{} ⚠️ 未生成题目", ctx);
            return (ProcessResult::Empty, result.questions);
        }

        info!(
            "{} ✓ 生成 {} 道题 (输入 {} / 输出 {} tokens)",
            ctx,
            result.questions.len(),
            result.usage.input_tokens,
            result.usage.output_tokens
        );
        (ProcessResult::Success, result.questions)
    }
}
