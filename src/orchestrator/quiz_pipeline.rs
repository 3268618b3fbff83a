//! 文档出题流水线 - 编排层
//!
//! ## 职责
//!
//! 1. **提取文本**：委托 `TextExtractor`
//! 2. **分块**：委托 `Chunker`
//! 3. **配额调度**：按 [`chunk_quota`] 决定每块请求题数，凑够目标后立即停止
//! 4. **流程调度**：每个分块交给 `ChunkFlow`
//! 5. **文档计数**：循环结束后记录一次"文档完成"
//! 6. **统计输出**

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::clients::{LlmClient, LlmSegmenter, OpenAiQuestionSource};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Chunk, Question, QuizResult};
use crate::orchestrator::quota::chunk_quota;
use crate::services::chunker::ChunkerConfig;
use crate::services::question_generator::GeneratorConfig;
use crate::services::{Chunker, QuestionGenerator, TextExtractor, TokenCounter, UsageTracker};
use crate::utils::logging::{log_chunk_start, log_document_loaded, log_pipeline_complete};
use crate::workflow::{ChunkCtx, ChunkFlow, ProcessResult};

/// 分块处理统计
#[derive(Debug, Default)]
pub struct ChunkStats {
    pub processed: usize,
    pub empty: usize,
    pub skipped: usize,
}

pub struct QuizPipeline {
    extractor: TextExtractor,
    chunker: Chunker,
    flow: ChunkFlow,
    tracker: Arc<UsageTracker>,
}

impl QuizPipeline {
    pub fn new(
        extractor: TextExtractor,
        chunker: Chunker,
        flow: ChunkFlow,
        tracker: Arc<UsageTracker>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            flow,
            tracker,
        }
    }

    /// 按配置装配 OpenAI 兼容的出题源和分段器
    pub fn from_config(config: &Config, tracker: Arc<UsageTracker>) -> Self {
        let client = LlmClient::new(config);
        let counter = Arc::new(TokenCounter::new());

        let chunker_config = ChunkerConfig::from(config);
        let chunker = if config.smart_chunking {
            let segmenter = LlmSegmenter::new(client.clone(), counter.clone());
            Chunker::new(Arc::new(segmenter), chunker_config).with_tracker(tracker.clone())
        } else {
            Chunker::fixed_size(chunker_config)
        };

        let generator = QuestionGenerator::new(
            Arc::new(OpenAiQuestionSource::new(client)),
            counter,
            GeneratorConfig::from(config),
        );
        let flow = ChunkFlow::new(generator, tracker.clone())
            .with_verbose_logging(config.verbose_chunk_logging);

        Self::new(TextExtractor::new(), chunker, flow, tracker)
    }

    /// 处理 PDF 文件
    ///
    /// 只有文件无法读取或解析时返回错误；各分块的失败只记录日志。
    pub async fn run(&self, path: &Path, target: usize) -> AppResult<QuizResult> {
        let text = self.extractor.extract(path).await?;
        Ok(self.run_text(&text, target).await)
    }

    /// 处理内存中的 PDF 数据
    pub async fn run_bytes(&self, bytes: Vec<u8>, target: usize) -> AppResult<QuizResult> {
        let text = self.extractor.extract_bytes(bytes).await?;
        Ok(self.run_text(&text, target).await)
    }

    /// 对已提取的全文分块并出题
    pub async fn run_text(&self, text: &str, target: usize) -> QuizResult {
        let text_length = text.chars().count();

        if target == 0 {
            info!("目标题数为 0，跳过");
            return QuizResult::new(Vec::new(), 0, text_length);
        }

        let chunks = self.chunker.chunk(text).await;
        log_document_loaded(text_length, chunks.len(), target);

        if chunks.is_empty() {
            info!("没有可用分块，跳过");
            return QuizResult::new(Vec::new(), 0, text_length);
        }

        let (mut questions, stats) = self.process_chunks(&chunks, target).await;

        self.tracker.record(0, 0, true).await;

        questions.truncate(target);
        log_pipeline_complete(
            stats.processed,
            stats.empty,
            stats.skipped,
            questions.len(),
            target,
        );

        QuizResult::new(questions, chunks.len(), text_length)
    }

    async fn process_chunks(
        &self,
        chunks: &[Chunk],
        target: usize,
    ) -> (Vec<Question>, ChunkStats) {
        let chunk_count = chunks.len();
        let mut questions = Vec::with_capacity(target);
        let mut stats = ChunkStats::default();

        for (index, chunk) in chunks.iter().enumerate() {
            if questions.len() >= target {
                stats.skipped = chunk_count - index;
                info!("✓ 已凑够 {} 道题，跳过剩余 {} 个分块", target, stats.skipped);
                break;
            }

            let requested = chunk_quota(index, chunk_count, target, questions.len());
            log_chunk_start(index, chunk_count, requested);

            let ctx = ChunkCtx::new(index, chunk_count, requested);
            let (result, generated) = self.flow.run(chunk, &ctx).await;
            match result {
                ProcessResult::Success => stats.processed += 1,
                ProcessResult::Empty => stats.empty += 1,
            }
            questions.extend(generated);
        }

        (questions, stats)
    }
}
