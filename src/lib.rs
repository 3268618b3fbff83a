//! # PDF Quiz
//!
//! 从 PDF 文档生成选择题的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 模型调用层（Clients）
//! - `clients/` - 持有 OpenAI 兼容客户端，只暴露能力
//! - `LlmClient` - 发送对话请求，返回文本和用量
//! - `StructuredGenerator` / `Segmenter` - 出题和分段的接口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `TextExtractor` - PDF 文本提取
//! - `Chunker` - 分块（模型辅助 + 定长兜底）
//! - `QuestionGenerator` - 单个分块出题与校验
//! - `UsageTracker` - 用量与费用账本
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个分块"的完整处理流程
//! - `ChunkCtx` - 上下文封装（分块序号 + 请求题数）
//! - `ChunkFlow` - 流程编排（出题 → 记录用量）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/quota` - 配额分配
//! - `orchestrator/quiz_pipeline` - 整份文档的出题流水线
//!
//! 生成的 [`QuizResult`] 可交给 `quiz::QuizSession` 在终端答题。

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod quiz;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Question, QuizResult};
pub use orchestrator::QuizPipeline;
pub use quiz::QuizSession;
pub use services::UsageTracker;
pub use workflow::{ChunkCtx, ChunkFlow, ProcessResult};
