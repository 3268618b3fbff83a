//! Token 计数
//!
//! 使用 tiktoken 的 `o200k_base` 编码离线计数；编码表加载失败时退回到
//! "每 4 个字符约 1 个 token" 的粗略估算。两种方式都只是估算值，
//! 与服务端计费口径不完全一致。

use tiktoken_rs::CoreBPE;
use tracing::warn;

pub struct TokenCounter {
    bpe: Option<CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> Self {
        match tiktoken_rs::o200k_base() {
            Ok(bpe) => Self { bpe: Some(bpe) },
            Err(e) => {
                warn!("⚠️ 无法加载 tiktoken 编码表，改用字符数估算: {}", e);
                Self::heuristic()
            }
        }
    }

    /// 只用字符数估算的计数器
    pub fn heuristic() -> Self {
        Self { bpe: None }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => estimate_tokens(text),
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// 按 4 字符/token 向上取整估算
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
