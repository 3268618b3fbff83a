//! 出题服务 - 业务能力层
//!
//! 只负责"从一个分块出题"的能力，不关心分块顺序和配额。
//!
//! - 提交前把分块截断到 `max_input_chars` 个字符
//! - 每道题都必须通过 [`Question::try_from`]，任何一道无法修复则整块作废
//! - 失败不向上传播：返回空题目和零用量，只记录警告
//! - 服务端未报告用量时在本地估算（见 [`QuestionGenerator::estimate_usage`]）

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::question_source::{
    GenerationRequest, RawGeneration, StructuredGenerator, MCQ_SYSTEM_PROMPT,
};
use crate::config::Config;
use crate::error::LlmError;
use crate::models::{GenerationResult, Question, TokenUsage};
use crate::services::token_counter::TokenCounter;

#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    pub max_input_chars: usize,
    /// 估算用量时为系统提示词额外计入的 token 数
    pub prompt_overhead_tokens: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 4000,
            prompt_overhead_tokens: 300,
        }
    }
}

impl From<&Config> for GeneratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_input_chars: config.max_input_chars,
            prompt_overhead_tokens: config.prompt_overhead_tokens,
        }
    }
}

pub struct QuestionGenerator {
    source: Arc<dyn StructuredGenerator>,
    counter: Arc<TokenCounter>,
    config: GeneratorConfig,
}

impl QuestionGenerator {
    pub fn new(
        source: Arc<dyn StructuredGenerator>,
        counter: Arc<TokenCounter>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            source,
            counter,
            config,
        }
    }

    /// 从一个分块生成至多 `requested_count` 道题
    ///
    /// 失败时返回空结果，不中断整个流水线。
    pub async fn generate(&self, chunk_text: &str, requested_count: usize) -> GenerationResult {
        if requested_count == 0 {
            return GenerationResult::empty();
        }

        match self.try_generate(chunk_text, requested_count).await {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️ 出题失败: {}", e);
                GenerationResult::empty()
            }
        }
    }

    /// 与 [`generate`](Self::generate) 相同，但把失败原因交给调用方
    pub async fn try_generate(
        &self,
        chunk_text: &str,
        requested_count: usize,
    ) -> Result<GenerationResult, LlmError> {
        let content = truncate_chars(chunk_text, self.config.max_input_chars);
        let request = GenerationRequest {
            system: MCQ_SYSTEM_PROMPT,
            content,
            count: requested_count,
        };

        let raw = self.source.generate(&request).await?;
        let usage = if raw.usage.is_zero() {
            let estimated = self.estimate_usage(content, &raw);
            debug!(
                "服务端未报告用量，本地估算: 输入 {} / 输出 {}",
                estimated.input_tokens, estimated.output_tokens
            );
            estimated
        } else {
            raw.usage
        };

        let mut questions = validate_questions(raw)?;
        if questions.len() > requested_count {
            debug!("模型返回 {} 道题，截断为 {}", questions.len(), requested_count);
            questions.truncate(requested_count);
        }

        Ok(GenerationResult { questions, usage })
    }

    /// 估算本次调用的用量
    ///
    /// 这是启发式估算，不是计费口径：输入按提交内容计数再加上
    /// `prompt_overhead_tokens`，输出按模型原始输出计数。
    pub fn estimate_usage(&self, submitted: &str, raw: &RawGeneration) -> TokenUsage {
        let output_tokens = if raw.raw_output.is_empty() {
            serde_json::to_string(&raw.questions)
                .map(|s| self.counter.count(&s))
                .unwrap_or(0)
        } else {
            self.counter.count(&raw.raw_output)
        };

        TokenUsage::new(
            self.counter.count(submitted) as u64 + self.config.prompt_overhead_tokens,
            output_tokens as u64,
        )
    }
}

fn validate_questions(raw: RawGeneration) -> Result<Vec<Question>, LlmError> {
    raw.questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            Question::try_from(q).map_err(|source| LlmError::InvalidQuestion { index, source })
        })
        .collect()
}

/// 按字符截断，返回原字符串的切片
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawQuestion;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 按预设返回结果，并记录收到的请求内容
    struct ScriptedSource {
        reply: Result<RawGeneration, fn() -> LlmError>,
        seen_content: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedSource {
        fn ok(reply: RawGeneration) -> Self {
            Self {
                reply: Ok(reply),
                seen_content: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(|| LlmError::EmptyContent {
                    model: "test".to_string(),
                }),
                seen_content: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StructuredGenerator for ScriptedSource {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<RawGeneration, LlmError> {
            self.seen_content
                .lock()
                .unwrap()
                .push((request.content.to_string(), request.count));
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(make_err) => Err(make_err()),
            }
        }
    }

    fn raw_question(answer: &str) -> RawQuestion {
        RawQuestion {
            question: "What is a block?".to_string(),
            options: vec!["A. x".into(), "B. y".into(), "C. z".into(), "D. w".into()],
            correct_answer: answer.to_string(),
            explanation: "because".to_string(),
            hint: "hint".to_string(),
            difficulty: "easy".to_string(),
        }
    }

    fn generator(source: Arc<ScriptedSource>) -> QuestionGenerator {
        QuestionGenerator::new(
            source,
            Arc::new(TokenCounter::heuristic()),
            GeneratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_reported_usage_is_preferred_and_output_capped() {
        let source = Arc::new(ScriptedSource::ok(RawGeneration {
            questions: vec![raw_question("A"), raw_question("B"), raw_question("C")],
            usage: TokenUsage::new(120, 80),
            raw_output: "{...}".to_string(),
        }));
        let result = generator(source.clone()).generate("chunk", 2).await;

        assert_eq!(result.questions.len(), 2);
        assert_eq!(result.usage, TokenUsage::new(120, 80));
        assert_eq!(source.seen_content.lock().unwrap()[0].1, 2);
    }

    #[tokio::test]
    async fn test_missing_usage_is_estimated_with_overhead() {
        let source = Arc::new(ScriptedSource::ok(RawGeneration {
            questions: vec![raw_question("A")],
            usage: TokenUsage::default(),
            raw_output: "x".repeat(40),
        }));
        let result = generator(source).generate(&"y".repeat(400), 1).await;

        assert_eq!(result.usage, TokenUsage::new(100 + 300, 10));
    }

    #[tokio::test]
    async fn test_input_is_truncated_before_submission() {
        let source = Arc::new(ScriptedSource::ok(RawGeneration::default()));
        let long_text = "é".repeat(5000);
        generator(source.clone()).generate(&long_text, 1).await;

        let seen = source.seen_content.lock().unwrap();
        assert_eq!(seen[0].0.chars().count(), 4000);
    }

    #[tokio::test]
    async fn test_model_error_yields_empty_result() {
        let source = Arc::new(ScriptedSource::failing());
        let result = generator(source).generate("chunk", 3).await;
        assert_eq!(result, GenerationResult::empty());
    }

    #[tokio::test]
    async fn test_one_invalid_question_discards_the_chunk() {
        let source = Arc::new(ScriptedSource::ok(RawGeneration {
            questions: vec![raw_question("A"), raw_question("Z")],
            usage: TokenUsage::new(10, 10),
            raw_output: String::new(),
        }));
        let gen = generator(source);

        let err = gen.try_generate("chunk", 2).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidQuestion { index: 1, .. }));

        let result = gen.generate("chunk", 2).await;
        assert!(result.questions.is_empty());
        assert!(result.usage.is_zero());
    }

    #[tokio::test]
    async fn test_zero_request_skips_model_call() {
        let source = Arc::new(ScriptedSource::failing());
        let result = generator(source.clone()).generate("chunk", 0).await;
        assert!(result.questions.is_empty());
        assert!(source.seen_content.lock().unwrap().is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("你好世界", 3), "你好世");
        assert_eq!(truncate_chars("", 0), "");
    }
}
