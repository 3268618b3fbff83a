//! 结构化出题接口
//!
//! 流水线只依赖 [`StructuredGenerator`]：给定系统指令、内容和题目数量，
//! 返回未经校验的题目记录和本次调用的用量。
//! [`OpenAiQuestionSource`] 是基于 [`LlmClient`] 的实现，
//! 通过提示词约束 JSON 结构，并在本地解析。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::clients::llm_client::LlmClient;
use crate::error::LlmError;
use crate::models::{RawQuestion, TokenUsage};

/// 出题系统指令
pub const MCQ_SYSTEM_PROMPT: &str = r#"You are an expert educator creating multiple-choice questions.

STRICT FORMATTING RULES:
- Options MUST be formatted as: "A. text", "B. text", "C. text", "D. text"
- correct_answer MUST be ONLY the letter: "A", "B", "C", or "D" (no periods, no text)
- difficulty MUST be: "easy", "medium", or "hard" (lowercase)

CONTENT GUIDELINES:
- Questions must be clear and test understanding
- Create exactly 4 options (A, B, C, D)
- Only ONE correct answer
- Distractors should be plausible but wrong
- Explanation references the content
- Hint guides thinking without revealing answer
- Mix easy, medium, and hard difficulties

OUTPUT FORMAT:
Respond with a single JSON object and nothing else:
{"questions": [
  {
    "question": "What is X?",
    "options": ["A. First option", "B. Second option", "C. Third option", "D. Fourth option"],
    "correct_answer": "C",
    "explanation": "The answer is C because...",
    "hint": "Think about...",
    "difficulty": "medium"
  }
]}"#;

/// 一次出题请求
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub content: &'a str,
    pub count: usize,
}

/// 模型返回的原始结果
#[derive(Debug, Clone, Default)]
pub struct RawGeneration {
    pub questions: Vec<RawQuestion>,
    /// 服务端报告的用量，未报告时为零
    pub usage: TokenUsage,
    /// 模型原始输出，用于本地估算用量
    pub raw_output: String,
}

/// 结构化出题能力
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<RawGeneration, LlmError>;
}

/// 基于 OpenAI 兼容接口的出题实现
pub struct OpenAiQuestionSource {
    client: LlmClient,
}

impl OpenAiQuestionSource {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiQuestionSource {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<RawGeneration, LlmError> {
        let user_message = build_user_message(request.content, request.count);
        let reply = self
            .client
            .send_to_llm(&user_message, Some(request.system))
            .await?;

        let questions = parse_questions(&reply.content)?;
        debug!("模型返回 {} 道原始题目", questions.len());

        Ok(RawGeneration {
            questions,
            usage: reply.usage,
            raw_output: reply.content,
        })
    }
}

/// 构建出题用户消息
pub fn build_user_message(content: &str, count: usize) -> String {
    format!(
        r#"Create {count} multiple-choice questions from this content:
{content}

Remember:
- Options format: "A. text", "B. text", "C. text", "D. text"
- correct_answer: Just the letter (A, B, C, or D)
- difficulty: easy, medium, or hard

Generate {count} questions now."#
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionPayload {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

/// 解析模型输出中的题目列表
///
/// 接受 `{"questions": [...]}` 或裸数组，容忍 Markdown 代码块包裹和前后说明文字。
pub fn parse_questions(content: &str) -> Result<Vec<RawQuestion>, LlmError> {
    let mut last_error = None;

    for candidate in json_candidates(content) {
        match serde_json::from_str::<QuestionPayload>(candidate) {
            Ok(QuestionPayload::Wrapped { questions }) | Ok(QuestionPayload::Bare(questions)) => {
                return Ok(questions)
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(LlmError::MalformedResponse {
        reason: match last_error {
            Some(e) => format!("JSON 结构不符: {}", e),
            None => "响应中没有 JSON 内容".to_string(),
        },
    })
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("static regex"))
}

/// 候选 JSON 片段：先取代码块内容，再取每个 `{`/`[` 起始的括号配对片段
fn json_candidates(content: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = fence_regex()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|block| !block.is_empty())
        .collect();

    for (start, c) in content.char_indices() {
        if c == '{' || c == '[' {
            if let Some(span) = balanced_span(content, start) {
                candidates.push(span);
            }
        }
    }
    candidates
}

/// 从 `start` 处的开括号起找到与之配对的闭括号，跳过字符串内的括号
fn balanced_span(content: &str, start: usize) -> Option<&str> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in content[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&content[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
