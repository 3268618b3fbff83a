//! 答题会话
//!
//! 在一个不可变的 [`QuizResult`] 上维护当前题号和已作答记录。
//! 判分只比较选项标签是否相等。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::models::{OptionLabel, Question, QuizResult};

/// 作答反馈
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerFeedback {
    Correct { explanation: String },
    Incorrect { hint: String },
}

impl AnswerFeedback {
    pub fn is_correct(&self) -> bool {
        matches!(self, AnswerFeedback::Correct { .. })
    }
}

/// 最终得分
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
}

/// 复盘条目
#[derive(Debug, Clone)]
pub struct ReviewEntry<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub selected: Option<OptionLabel>,
    pub is_correct: bool,
}

pub struct QuizSession {
    quiz: Arc<QuizResult>,
    current: usize,
    answers: BTreeMap<usize, OptionLabel>,
}

impl QuizSession {
    pub fn new(quiz: Arc<QuizResult>) -> Self {
        Self {
            quiz,
            current: 0,
            answers: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiz.questions.is_empty()
    }

    /// 当前题目；空测验返回 `None`
    pub fn current(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current)
    }

    /// 当前题号（从0开始）
    pub fn position(&self) -> usize {
        self.current
    }

    /// 前进一题，已在最后一题时不动并返回 `false`
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// 后退一题，已在第一题时不动并返回 `false`
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len()
    }

    /// 回答当前题目，重复作答覆盖上一次的选择
    ///
    /// 空测验返回 `None`。
    pub fn answer(&mut self, label: OptionLabel) -> Option<AnswerFeedback> {
        let question = self.quiz.questions.get(self.current)?;
        self.answers.insert(self.current, label);

        let feedback = if question.is_correct(label) {
            AnswerFeedback::Correct {
                explanation: question.explanation().to_string(),
            }
        } else {
            AnswerFeedback::Incorrect {
                hint: question.hint().to_string(),
            }
        };
        Some(feedback)
    }

    pub fn answer_for(&self, index: usize) -> Option<OptionLabel> {
        self.answers.get(&index).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// 统计得分，未作答的题算错
    pub fn finish(&self) -> QuizScore {
        let total = self.len();
        let correct = self
            .quiz
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answer_for(*i).is_some_and(|a| q.is_correct(a)))
            .count();
        let percentage = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64 * 100.0
        };

        QuizScore {
            correct,
            total,
            percentage,
        }
    }

    pub fn review(&self) -> Vec<ReviewEntry<'_>> {
        self.quiz
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let selected = self.answer_for(index);
                ReviewEntry {
                    index,
                    question,
                    selected,
                    is_correct: selected.is_some_and(|a| question.is_correct(a)),
                }
            })
            .collect()
    }
}
