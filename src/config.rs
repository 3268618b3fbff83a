use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 分块配置 ---
    /// 是否启用模型辅助分块，关闭时直接使用定长切分
    pub smart_chunking: bool,
    pub chunk_size_tokens: usize,
    pub chunk_candidate_tokens: usize,
    pub chunk_min_chars: usize,
    pub fallback_chunk_chars: usize,
    /// 处理每个分块时在日志中打印分块内容摘要
    pub verbose_chunk_logging: bool,
    // --- 出题配置 ---
    /// 提交给模型的分块文本字符上限
    pub max_input_chars: usize,
    /// 估算用量时为系统提示词预留的 token 数（经验值）
    pub prompt_overhead_tokens: u64,
    // --- 用量统计 ---
    pub usage_stats_file: PathBuf,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
    // --- 调用方限制 ---
    pub max_upload_bytes: u64,
    pub min_questions: usize,
    pub max_questions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 4096,
            smart_chunking: true,
            chunk_size_tokens: 1024,
            chunk_candidate_tokens: 128,
            chunk_min_chars: 100,
            fallback_chunk_chars: 1000,
            verbose_chunk_logging: false,
            max_input_chars: 4000,
            prompt_overhead_tokens: 300,
            usage_stats_file: PathBuf::from("data/usage_stats.json"),
            input_cost_per_million: 2.50,
            output_cost_per_million: 10.00,
            max_upload_bytes: 10 * 1024 * 1024,
            min_questions: 3,
            max_questions: 100,
        }
    }
}

impl Config {
    /// 从环境变量加载配置（会先尝试读取 `.env`），缺失或无法解析的值使用默认值
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let default = Self::default();
        Self {
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("OPENAI_API_BASE").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("OPENAI_MODEL").unwrap_or(default.llm_model_name),
            llm_temperature: parse_env("OPENAI_TEMPERATURE").unwrap_or(default.llm_temperature),
            llm_max_tokens: parse_env("OPENAI_MAX_TOKENS").unwrap_or(default.llm_max_tokens),
            smart_chunking: parse_env("SMART_CHUNKING").unwrap_or(default.smart_chunking),
            chunk_size_tokens: parse_env("CHUNK_SIZE_TOKENS").unwrap_or(default.chunk_size_tokens),
            chunk_candidate_tokens: parse_env("CHUNK_CANDIDATE_TOKENS").unwrap_or(default.chunk_candidate_tokens),
            chunk_min_chars: parse_env("CHUNK_MIN_CHARS").unwrap_or(default.chunk_min_chars),
            fallback_chunk_chars: parse_env("FALLBACK_CHUNK_CHARS").unwrap_or(default.fallback_chunk_chars),
            verbose_chunk_logging: parse_env("VERBOSE_CHUNK_LOGGING").unwrap_or(default.verbose_chunk_logging),
            max_input_chars: parse_env("MAX_INPUT_CHARS").unwrap_or(default.max_input_chars),
            prompt_overhead_tokens: parse_env("PROMPT_OVERHEAD_TOKENS").unwrap_or(default.prompt_overhead_tokens),
            usage_stats_file: std::env::var("USAGE_STATS_FILE").map(PathBuf::from).unwrap_or(default.usage_stats_file),
            input_cost_per_million: parse_env("INPUT_COST_PER_MILLION").unwrap_or(default.input_cost_per_million),
            output_cost_per_million: parse_env("OUTPUT_COST_PER_MILLION").unwrap_or(default.output_cost_per_million),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES").unwrap_or(default.max_upload_bytes),
            min_questions: default.min_questions,
            max_questions: default.max_questions,
        }
    }

    /// 检查 API Key 是否已配置
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            });
        }
        Ok(&self.llm_api_key)
    }

    /// 检查题目数量是否在允许范围内
    pub fn check_question_count(&self, requested: usize) -> Result<usize, ConfigError> {
        if (self.min_questions..=self.max_questions).contains(&requested) {
            Ok(requested)
        } else {
            Err(ConfigError::QuestionCountOutOfRange {
                requested,
                min: self.min_questions,
                max: self.max_questions,
            })
        }
    }

    /// 检查上传文件的扩展名和大小
    pub fn check_upload(&self, path: &Path, size: u64) -> Result<(), ConfigError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(ConfigError::UnsupportedFile {
                path: path.display().to_string(),
            });
        }
        if size > self.max_upload_bytes {
            return Err(ConfigError::UploadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    std::env::var(var_name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = Config::default();
        assert_eq!(config.max_input_chars, 4000);
        assert_eq!(config.fallback_chunk_chars, 1000);
        assert!(!config.verbose_chunk_logging);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!((config.min_questions, config.max_questions), (3, 100));
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("PDF_QUIZ_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_env::<usize>("PDF_QUIZ_TEST_GARBAGE"), None);
        std::env::set_var("PDF_QUIZ_TEST_NUMBER", " 42 ");
        assert_eq!(parse_env::<usize>("PDF_QUIZ_TEST_NUMBER"), Some(42));
    }

    #[test]
    fn test_question_count_range() {
        let config = Config::default();
        assert_eq!(config.check_question_count(3).unwrap(), 3);
        assert_eq!(config.check_question_count(100).unwrap(), 100);
        assert!(matches!(
            config.check_question_count(2),
            Err(ConfigError::QuestionCountOutOfRange { requested: 2, min: 3, max: 100 })
        ));
        assert!(config.check_question_count(101).is_err());
    }

    #[test]
    fn test_upload_checks() {
        let config = Config::default();
        assert!(config.check_upload(Path::new("paper.PDF"), 1024).is_ok());
        assert!(matches!(
            config.check_upload(Path::new("notes.txt"), 10),
            Err(ConfigError::UnsupportedFile { .. })
        ));
        assert!(matches!(
            config.check_upload(Path::new("big.pdf"), 10 * 1024 * 1024 + 1),
            Err(ConfigError::UploadTooLarge { .. })
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config {
            llm_api_key: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::EnvVarNotFound { .. })
        ));
    }
}
