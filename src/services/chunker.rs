//! 分块服务 - 业务能力层
//!
//! 优先使用 [`Segmenter`] 按主题分块；分段器未配置、调用失败或返回空结果时，
//! 退回到按固定字符数切分，保证非空文本至少得到一个分块。
//!
//! 挂载了 [`UsageTracker`] 时，分段成功后逐次记录分段模型调用的用量。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::segmenter::{SegmentParams, Segmentation, Segmenter};
use crate::config::Config;
use crate::models::{Chunk, TokenUsage};
use crate::services::usage_tracker::UsageTracker;

/// 分块配置
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub params: SegmentParams,
    /// 兜底切分的每块字符数
    pub fallback_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            params: SegmentParams::default(),
            fallback_chunk_chars: 1000,
        }
    }
}

impl From<&Config> for ChunkerConfig {
    fn from(config: &Config) -> Self {
        Self {
            params: SegmentParams {
                chunk_size_tokens: config.chunk_size_tokens,
                candidate_tokens: config.chunk_candidate_tokens,
                min_chars: config.chunk_min_chars,
            },
            fallback_chunk_chars: config.fallback_chunk_chars,
        }
    }
}

pub struct Chunker {
    segmenter: Option<Arc<dyn Segmenter>>,
    tracker: Option<Arc<UsageTracker>>,
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(segmenter: Arc<dyn Segmenter>, config: ChunkerConfig) -> Self {
        Self {
            segmenter: Some(segmenter),
            tracker: None,
            config,
        }
    }

    /// 只做定长切分的分块器
    pub fn fixed_size(config: ChunkerConfig) -> Self {
        Self {
            segmenter: None,
            tracker: None,
            config,
        }
    }

    /// 记录分段调用用量的账本
    pub fn with_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// 将全文切成有序分块；空文本返回空列表
    pub async fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let spans = match &self.segmenter {
            Some(segmenter) => match segmenter.segment(text, &self.config.params).await {
                Ok(segmentation) => {
                    let spans = self.accept(segmentation).await;
                    if spans.is_empty() {
                        warn!("⚠️ 智能分块返回空结果，改用定长切分");
                        fixed_size_split(text, self.config.fallback_chunk_chars)
                    } else {
                        spans
                    }
                }
                Err(e) => {
                    warn!("⚠️ 智能分块失败，改用定长切分: {}", e);
                    fixed_size_split(text, self.config.fallback_chunk_chars)
                }
            },
            None => fixed_size_split(text, self.config.fallback_chunk_chars),
        };

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk::new(index, span))
            .collect();

        info!("✅ 共生成 {} 个分块", chunks.len());
        chunks
    }

    /// 记录分段用量并去掉空白片段
    async fn accept(&self, segmentation: Segmentation) -> Vec<String> {
        if let Some(tracker) = &self.tracker {
            let mut total = TokenUsage::default();
            for usage in &segmentation.call_usage {
                tracker
                    .record(usage.input_tokens, usage.output_tokens, false)
                    .await;
                total += *usage;
            }
            if !segmentation.call_usage.is_empty() {
                debug!(
                    "分块调用 {} 次，共 {} tokens",
                    segmentation.call_usage.len(),
                    total.total()
                );
            }
        }

        segmentation
            .spans
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}

/// 按固定字符数切分（按字符而非字节，不会切断 UTF-8 字符）
///
/// 长度为 L 的文本得到 ceil(L / size) 段，按顺序覆盖原文，无重叠无遗漏。
pub fn fixed_size_split(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            spans.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        spans.push(current);
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::segmenter::SegmentError;
    use crate::error::LlmError;
    use async_trait::async_trait;

    struct FailingSegmenter;

    #[async_trait]
    impl Segmenter for FailingSegmenter {
        async fn segment(&self, _: &str, _: &SegmentParams) -> Result<Segmentation, SegmentError> {
            Err(SegmentError::Llm(LlmError::EmptyContent {
                model: "test".to_string(),
            }))
        }
    }

    struct EmptySegmenter;

    #[async_trait]
    impl Segmenter for EmptySegmenter {
        async fn segment(&self, _: &str, _: &SegmentParams) -> Result<Segmentation, SegmentError> {
            Ok(Segmentation::from_spans(vec!["   ".to_string()]))
        }
    }

    struct SentenceSegmenter;

    #[async_trait]
    impl Segmenter for SentenceSegmenter {
        async fn segment(&self, text: &str, _: &SegmentParams) -> Result<Segmentation, SegmentError> {
            Ok(Segmentation::from_spans(
                text.split_inclusive(". ").map(str::to_string).collect(),
            ))
        }
    }

    /// 每个句子边界算一次模型调用
    struct BilledSegmenter;

    #[async_trait]
    impl Segmenter for BilledSegmenter {
        async fn segment(&self, text: &str, _: &SegmentParams) -> Result<Segmentation, SegmentError> {
            let spans: Vec<String> = text.split_inclusive(". ").map(str::to_string).collect();
            let call_usage = vec![TokenUsage::new(200, 6); spans.len() - 1];
            Ok(Segmentation { spans, call_usage })
        }
    }

    fn small_config() -> ChunkerConfig {
        ChunkerConfig {
            fallback_chunk_chars: 10,
            ..ChunkerConfig::default()
        }
    }

    #[test]
    fn test_fixed_size_split_covers_text_exactly() {
        for (len, size) in [(0usize, 10usize), (1, 10), (10, 10), (25, 10), (2500, 1000)] {
            let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let spans = fixed_size_split(&text, size);
            assert_eq!(spans.len(), len.div_ceil(size));
            assert_eq!(spans.concat(), text);
            assert!(spans.iter().all(|s| s.chars().count() <= size));
        }
    }

    #[test]
    fn test_fixed_size_split_is_char_boundary_safe() {
        let spans = fixed_size_split("比特币是点对点电子现金系统", 5);
        assert_eq!(spans, vec!["比特币是点", "对点电子现", "金系统"]);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_fixed_size() {
        let chunker = Chunker::new(Arc::new(FailingSegmenter), small_config());
        let chunks = chunker.chunk("abcdefghijklmnopqrstuvwxy").await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text(), "uvwxy");
        assert_eq!(chunks[2].index(), 2);
    }

    #[tokio::test]
    async fn test_blank_segmentation_falls_back() {
        let chunker = Chunker::new(Arc::new(EmptySegmenter), small_config());
        let chunks = chunker.chunk("Empty PDF").await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), "Empty PDF");
    }

    #[tokio::test]
    async fn test_segmenter_output_is_used_in_order() {
        let chunker = Chunker::new(Arc::new(SentenceSegmenter), small_config());
        let chunks = chunker.chunk("One. Two. Three").await;
        let texts: Vec<&str> = chunks.iter().map(|c| c.text()).collect();
        assert_eq!(texts, vec!["One. ", "Two. ", "Three"]);
    }

    #[tokio::test]
    async fn test_segmenter_calls_are_recorded_in_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(UsageTracker::new(
            dir.path().join("usage_stats.json"),
            crate::models::Pricing::default(),
        ));
        let chunker =
            Chunker::new(Arc::new(BilledSegmenter), small_config()).with_tracker(tracker.clone());

        let chunks = chunker.chunk("One. Two. Three").await;
        assert_eq!(chunks.len(), 3);

        let ledger = tracker.snapshot().await.unwrap();
        assert_eq!(ledger.total_api_calls, 2);
        assert_eq!(ledger.tokens.input, 400);
        assert_eq!(ledger.tokens.output, 12);
        assert_eq!(ledger.total_documents_processed, 0);
    }

    #[tokio::test]
    async fn test_failed_segmentation_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(UsageTracker::new(
            dir.path().join("usage_stats.json"),
            crate::models::Pricing::default(),
        ));
        let chunker =
            Chunker::new(Arc::new(FailingSegmenter), small_config()).with_tracker(tracker.clone());

        chunker.chunk("abcdefghijklmnopqrstuvwxy").await;
        let ledger = tracker.snapshot().await.unwrap();
        assert_eq!(ledger.total_api_calls, 0);
    }

    #[tokio::test]
    async fn test_empty_text_yields_no_chunks() {
        let chunker = Chunker::fixed_size(small_config());
        assert!(chunker.chunk("").await.is_empty());
    }
}
