use serde::{Deserialize, Serialize};

use crate::models::question::Question;
use crate::models::usage::TokenUsage;

/// 单个分块的出题结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub questions: Vec<Question>,
    pub usage: TokenUsage,
}

impl GenerationResult {
    /// 失败时的空结果：没有题目，用量为零
    pub fn empty() -> Self {
        Self::default()
    }
}

/// 整份文档的处理统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub num_chunks: usize,
    pub total_questions: usize,
    /// 原文长度（字符数）
    pub text_length: usize,
}

/// 最终交给调用方的测验
///
/// 生成后不再修改；界面层通过 `Arc<QuizResult>` 共享。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub questions: Vec<Question>,
    pub metadata: QuizMetadata,
}

impl QuizResult {
    pub fn new(questions: Vec<Question>, num_chunks: usize, text_length: usize) -> Self {
        let total_questions = questions.len();
        Self {
            questions,
            metadata: QuizMetadata {
                num_chunks,
                total_questions,
                text_length,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}
