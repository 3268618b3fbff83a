//! 选择题模型
//!
//! `Question` 只能通过 [`Question::try_from`]（或 [`Question::new`]）构造，
//! 构造即校验：模型返回的 [`RawQuestion`] 在这里被规范化或拒绝，
//! 之后流转的题目一定满足：
//! - 恰好 4 个选项，依次以 `"A. "`、`"B. "`、`"C. "`、`"D. "` 开头
//! - 正确答案是 A/B/C/D 之一
//! - 难度是 easy/medium/hard 之一

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 选项标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn as_char(self) -> char {
        match self {
            OptionLabel::A => 'A',
            OptionLabel::B => 'B',
            OptionLabel::C => 'C',
            OptionLabel::D => 'D',
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLabel::A),
            'B' => Some(OptionLabel::B),
            'C' => Some(OptionLabel::C),
            'D' => Some(OptionLabel::D),
            _ => None,
        }
    }

    /// 解析答案字母，容忍大小写、句点、括号和空白
    ///
    /// `"C"`、`" c. "`、`"(C)"`、`"C) 第三项"` 都解析为 `C`；
    /// `"Cat"`、`"E"`、`""` 解析失败。
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('(').trim_start();
        let mut chars = trimmed.chars();
        let label = Self::from_char(chars.next()?)?;
        let rest = chars.as_str();
        let rest_ok = rest.is_empty()
            || rest.starts_with(['.', ')', ':'])
            || rest.starts_with(char::is_whitespace);
        rest_ok.then_some(label)
    }

    /// 选项前缀，如 `"A. "`
    pub fn prefix(self) -> String {
        format!("{}. ", self.as_char())
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 题目校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionValidationError {
    #[error("题干为空")]
    EmptyQuestionText,
    #[error("选项数量必须为 4，实际为 {found}")]
    WrongOptionCount { found: usize },
    #[error("选项 {label} 内容为空")]
    EmptyOption { label: OptionLabel },
    #[error("第 {label} 个位置的选项标注为 {found}")]
    MislabeledOption { label: OptionLabel, found: OptionLabel },
    #[error("无法识别的正确答案: {raw:?}")]
    InvalidAnswer { raw: String },
    #[error("无法识别的难度: {raw:?}")]
    InvalidDifficulty { raw: String },
}

/// 模型直接返回的题目记录，未经校验
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(alias = "text")]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub difficulty: String,
}

/// 已校验的选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    options: [String; 4],
    correct_answer: OptionLabel,
    explanation: String,
    hint: String,
    difficulty: Difficulty,
}

impl Question {
    /// 由各字段构造题目，校验规则与 [`Question::try_from`] 相同
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: &str,
        explanation: impl Into<String>,
        hint: impl Into<String>,
        difficulty: &str,
    ) -> Result<Self, QuestionValidationError> {
        Self::try_from(RawQuestion {
            question: text.into(),
            options,
            correct_answer: correct_answer.to_string(),
            explanation: explanation.into(),
            hint: hint.into(),
            difficulty: difficulty.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    pub fn correct_answer(&self) -> OptionLabel {
        self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// 按标签精确判断答案是否正确
    pub fn is_correct(&self, answer: OptionLabel) -> bool {
        answer == self.correct_answer
    }
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuestionValidationError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let text = raw.question.trim().to_string();
        if text.is_empty() {
            return Err(QuestionValidationError::EmptyQuestionText);
        }

        let found = raw.options.len();
        let options: [String; 4] = raw
            .options
            .try_into()
            .map_err(|_| QuestionValidationError::WrongOptionCount { found })?;

        let options = normalize_options(&options)?;

        let correct_answer = OptionLabel::parse(&raw.correct_answer).ok_or_else(|| {
            QuestionValidationError::InvalidAnswer {
                raw: raw.correct_answer.clone(),
            }
        })?;

        let difficulty = Difficulty::parse(&raw.difficulty).ok_or_else(|| {
            QuestionValidationError::InvalidDifficulty {
                raw: raw.difficulty.clone(),
            }
        })?;

        Ok(Self {
            text,
            options,
            correct_answer,
            explanation: raw.explanation.trim().to_string(),
            hint: raw.hint.trim().to_string(),
            difficulty,
        })
    }
}

impl From<&Question> for RawQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.text.clone(),
            options: q.options.to_vec(),
            correct_answer: q.correct_answer.to_string(),
            explanation: q.explanation.clone(),
            hint: q.hint.clone(),
            difficulty: q.difficulty.to_string(),
        }
    }
}

fn label_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(?([A-Da-d])[.):]\s*").expect("static regex"))
}

/// 拆出选项自带的标签（若有）和正文
fn split_option(raw: &str) -> (Option<OptionLabel>, &str) {
    let trimmed = raw.trim();
    match label_prefix_regex().captures(trimmed) {
        Some(caps) => {
            let label = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .and_then(OptionLabel::from_char);
            let end = caps.get(0).map_or(0, |m| m.end());
            (label, trimmed[end..].trim())
        }
        None => (None, trimmed),
    }
}

/// 规范化四个选项
///
/// - 四个选项都带标签且恰好是 A-D 的一个排列：按标签重新排序，答案仍指向原选项
/// - 没有标签的选项：按位置补标签
/// - 其余情况（标签与位置不符）：拒绝
fn normalize_options(raw: &[String; 4]) -> Result<[String; 4], QuestionValidationError> {
    let parsed: Vec<(Option<OptionLabel>, &str)> = raw.iter().map(|o| split_option(o)).collect();

    let labels: Vec<OptionLabel> = parsed.iter().filter_map(|(label, _)| *label).collect();
    let is_permutation =
        labels.len() == 4 && OptionLabel::ALL.iter().all(|label| labels.contains(label));

    let mut bodies = [""; 4];
    for (position, (label, body)) in parsed.iter().enumerate() {
        let expected = OptionLabel::ALL[position];
        let slot = match label {
            Some(found) if is_permutation => *found,
            Some(found) if *found != expected => {
                return Err(QuestionValidationError::MislabeledOption {
                    label: expected,
                    found: *found,
                })
            }
            _ => expected,
        };
        bodies[slot.index()] = body;
    }

    if let Some(label) = OptionLabel::ALL
        .into_iter()
        .find(|label| bodies[label.index()].is_empty())
    {
        return Err(QuestionValidationError::EmptyOption { label });
    }

    Ok(OptionLabel::ALL.map(|label| format!("{}{}", label.prefix(), bodies[label.index()])))
}
