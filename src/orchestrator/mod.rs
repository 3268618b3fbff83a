//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `quota` - 配额分配
//! - 纯函数，决定每个分块请求几道题
//!
//! ### `quiz_pipeline` - 文档出题流水线
//! - 提取文本、分块
//! - 遍历分块，凑够目标题数后停止
//! - 记录文档完成、输出统计
//!
//! ## 层次关系
//!
//! ```text
//! quiz_pipeline (处理一份文档)
//!     ↓
//! workflow::ChunkFlow (处理单个 Chunk)
//!     ↓
//! services (能力层：extract / chunk / generate / usage)
//!     ↓
//! clients (模型调用：LlmClient / StructuredGenerator / Segmenter)
//! ```

pub mod quiz_pipeline;
pub mod quota;

pub use quiz_pipeline::{ChunkStats, QuizPipeline};
pub use quota::{base_per_chunk, chunk_quota};
