//! 分块处理上下文
//!
//! 封装"正在处理第几个分块、向它要几道题"这一信息

use std::fmt::Display;

#[derive(Debug, Clone, Copy)]
pub struct ChunkCtx {
    /// 分块索引（从0开始）
    pub chunk_index: usize,
    pub chunk_count: usize,
    /// 本分块的请求题数
    pub requested: usize,
}

impl ChunkCtx {
    pub fn new(chunk_index: usize, chunk_count: usize, requested: usize) -> Self {
        Self {
            chunk_index,
            chunk_count,
            requested,
        }
    }
}

impl Display for ChunkCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[分块 {}/{} 请求#{}]",
            self.chunk_index + 1,
            self.chunk_count,
            self.requested
        )
    }
}
