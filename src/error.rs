//! 错误类型
//!
//! 库代码统一返回 [`AppError`]，二进制入口使用 `anyhow` 包装上下文。
//!
//! 按流水线阶段划分错误类别：
//! - `Pdf` - PDF 无法打开或解析（致命，向上传播）
//! - `Llm` - 模型调用失败（单个分块内可恢复）
//! - `Ledger` - 用量账本读写失败（记录后吞掉）
//! - `Config` - 配置错误
//!
//! 题目校验失败包装在 [`LlmError::InvalidQuestion`] 中，随所在分块一起作废。

use thiserror::Error;

use crate::models::question::QuestionValidationError;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("PDF错误: {0}")]
    Pdf(#[from] PdfError),

    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),

    #[error("账本错误: {0}")]
    Ledger(#[from] LedgerError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// PDF 相关错误
#[derive(Debug, Error)]
pub enum PdfError {
    /// 读取文件失败
    #[error("无法读取PDF文件 ({path}): {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 解析文档结构失败
    #[error("无法解析PDF文档 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: lopdf::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回结果为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 响应无法解析为约定的 JSON 结构
    #[error("无法解析LLM响应: {reason}")]
    MalformedResponse { reason: String },
    /// 响应中的题目未通过结构校验
    #[error("第 {index} 道题目未通过校验: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionValidationError,
    },
}

/// 用量账本错误
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("读取账本失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入账本失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("账本格式错误 ({path}): {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    #[error("题目数量 {requested} 超出范围 [{min}, {max}]")]
    QuestionCountOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("文件过大: {size} 字节 (上限: {limit} 字节)")]
    UploadTooLarge { size: u64, limit: u64 },
    #[error("不支持的文件类型: {path}")]
    UnsupportedFile { path: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建PDF读取错误
    pub fn pdf_open_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Pdf(PdfError::OpenFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建PDF解析错误
    pub fn pdf_parse_failed(path: impl Into<String>, source: lopdf::Error) -> Self {
        AppError::Pdf(PdfError::ParseFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建LLM响应解析错误
    pub fn llm_malformed(reason: impl Into<String>) -> Self {
        AppError::Llm(LlmError::MalformedResponse {
            reason: reason.into(),
        })
    }

    /// 是否属于会终止整个文档处理的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Pdf(_) | AppError::Config(_) | AppError::Task(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_errors_are_fatal() {
        let err = AppError::pdf_open_failed(
            "missing.pdf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(err.is_fatal());
        assert!(err.to_string().contains("missing.pdf"));
    }

    #[test]
    fn test_llm_errors_are_recoverable() {
        let err = AppError::llm_malformed("缺少 questions 字段");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("questions"));
    }
}
