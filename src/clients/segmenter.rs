//! 模型辅助分块
//!
//! 先把全文切成句子/段落级的候选片段，再按 token 预算取一个窗口，
//! 让模型判断窗口内从哪个片段开始进入新主题，在该处切开。
//! 返回的片段按顺序拼接后与原文完全一致。
//!
//! 每次模型调用的用量随结果一并返回，由调用方决定是否记账；
//! 分段中途失败时已发生调用的用量随错误一起丢弃，不计入账本。

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::clients::llm_client::LlmClient;
use crate::error::LlmError;
use crate::models::TokenUsage;
use crate::services::token_counter::TokenCounter;

const SEGMENT_SYSTEM_PROMPT: &str = "You split documents into topically coherent sections. \
You receive numbered consecutive passages. Answer with a JSON object {\"split_index\": N} \
where N is the number of the first passage that starts a NEW topic. \
If every passage continues the same topic, answer with the number after the last passage.";

/// 分块参数
#[derive(Debug, Clone, Copy)]
pub struct SegmentParams {
    /// 每块的目标 token 数
    pub chunk_size_tokens: usize,
    /// 提示词中每个候选片段最多展示的 token 数
    pub candidate_tokens: usize,
    /// 每块最少字符数（最后一块除外）
    pub min_chars: usize,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 1024,
            candidate_tokens: 128,
            min_chars: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("分块模型调用失败: {0}")]
    Llm(#[from] LlmError),
    #[error("无法解析分块位置: {reply:?}")]
    BadSplitIndex { reply: String },
}

/// 分段结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub spans: Vec<String>,
    /// 每次模型调用的用量，按调用顺序
    pub call_usage: Vec<TokenUsage>,
}

impl Segmentation {
    /// 不涉及模型调用的分段结果
    pub fn from_spans(spans: Vec<String>) -> Self {
        Self {
            spans,
            call_usage: Vec::new(),
        }
    }

    pub fn total_usage(&self) -> TokenUsage {
        self.call_usage
            .iter()
            .fold(TokenUsage::default(), |acc, usage| acc + *usage)
    }
}

/// 文本分段能力
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(&self, text: &str, params: &SegmentParams) -> Result<Segmentation, SegmentError>;
}

/// 基于 LLM 判断主题边界的分段实现
pub struct LlmSegmenter {
    client: LlmClient,
    counter: Arc<TokenCounter>,
}

impl LlmSegmenter {
    pub fn new(client: LlmClient, counter: Arc<TokenCounter>) -> Self {
        Self {
            client: client.with_temperature(0.0),
            counter,
        }
    }

    async fn ask_split_index(
        &self,
        window: &[&str],
        params: &SegmentParams,
    ) -> Result<(usize, TokenUsage), SegmentError> {
        let preview_chars = params.candidate_tokens.saturating_mul(4).max(1);
        let passages = window
            .iter()
            .enumerate()
            .map(|(i, piece)| format!("[{}] {}", i, preview(piece.trim(), preview_chars)))
            .collect::<Vec<_>>()
            .join("\n");

        let user_message = format!(
            "Passages 0 to {}:\n{}\n\nReturn the split_index as JSON.",
            window.len() - 1,
            passages
        );

        let reply = self
            .client
            .send_to_llm(&user_message, Some(SEGMENT_SYSTEM_PROMPT))
            .await?;

        match parse_split_index(&reply.content) {
            Some(index) => Ok((index, reply.usage)),
            None => Err(SegmentError::BadSplitIndex {
                reply: reply.content,
            }),
        }
    }
}

#[async_trait]
impl Segmenter for LlmSegmenter {
    async fn segment(&self, text: &str, params: &SegmentParams) -> Result<Segmentation, SegmentError> {
        let pieces = split_candidates(text);
        let tokens: Vec<usize> = pieces.iter().map(|p| self.counter.count(p)).collect();
        let budget = params.chunk_size_tokens.max(1);

        let mut result = Segmentation::default();
        let mut start = 0;

        while start < pieces.len() {
            let end = window_end(&tokens, start, budget);

            if end == pieces.len() {
                result.spans.push(pieces[start..].concat());
                break;
            }

            let mut cut = if end - start == 1 {
                end
            } else {
                let (k, usage) = self.ask_split_index(&pieces[start..end], params).await?;
                result.call_usage.push(usage);
                start + k.clamp(1, end - start)
            };

            while cut < pieces.len() && char_len(&pieces[start..cut]) < params.min_chars {
                cut += 1;
            }

            debug!("分块边界: 片段 {}..{}", start, cut);
            result.spans.push(pieces[start..cut].concat());
            start = cut;
        }

        Ok(result)
    }
}

fn boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+|\n\s*\n").expect("static regex"))
}

/// 按句末标点和空行切成候选片段，保留分隔符，拼接后等于原文
pub fn split_candidates(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in boundary_regex().find_iter(text) {
        pieces.push(&text[last..m.end()]);
        last = m.end();
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}

/// 从 `start` 起尽量多取片段而不超过预算；至少取一个
fn window_end(tokens: &[usize], start: usize, budget: usize) -> usize {
    let mut end = start;
    let mut used = 0;
    while end < tokens.len() && (end == start || used + tokens[end] <= budget) {
        used += tokens[end];
        end += 1;
    }
    end
}

fn char_len(pieces: &[&str]) -> usize {
    pieces.iter().map(|p| p.chars().count()).sum()
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 解析模型返回的切分位置
///
/// 优先读取 JSON 中的 `split_index`，否则取响应中的第一个数字。
fn parse_split_index(reply: &str) -> Option<usize> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(reply.trim()) {
        if let Some(index) = value.get("split_index").and_then(|v| v.as_u64()) {
            return Some(index as usize);
        }
    }

    reply
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_candidates_round_trips_text() {
        let text = "First sentence. Second one!\n\nNew paragraph? Trailing words";
        let pieces = split_candidates(text);
        assert_eq!(pieces.concat(), text);
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[0], "First sentence. ");
        assert_eq!(pieces[3], "Trailing words");
    }

    #[test]
    fn test_split_candidates_handles_text_without_boundaries() {
        assert_eq!(split_candidates("no boundary here"), vec!["no boundary here"]);
        assert!(split_candidates("").is_empty());
    }

    #[test]
    fn test_window_end_respects_budget_but_takes_one() {
        let tokens = [5, 5, 5, 50, 5];
        assert_eq!(window_end(&tokens, 0, 12), 2);
        assert_eq!(window_end(&tokens, 3, 12), 4);
        assert_eq!(window_end(&tokens, 4, 12), 5);
    }

    #[test]
    fn test_total_usage_sums_every_call() {
        let segmentation = Segmentation {
            spans: vec!["a".to_string()],
            call_usage: vec![TokenUsage::new(100, 5), TokenUsage::new(80, 4)],
        };
        assert_eq!(segmentation.total_usage(), TokenUsage::new(180, 9));
        assert!(Segmentation::from_spans(vec![]).total_usage().is_zero());
    }

    #[test]
    fn test_parse_split_index() {
        assert_eq!(parse_split_index(r#"{"split_index": 3}"#), Some(3));
        assert_eq!(parse_split_index("The new topic starts at 2."), Some(2));
        assert_eq!(parse_split_index("no idea"), None);
    }
}
