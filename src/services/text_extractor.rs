//! 文本提取服务 - 业务能力层
//!
//! 逐页提取 PDF 文本。单页失败或只有空白时跳过并记录警告；
//! 所有页都没有文本时返回 [`EMPTY_DOCUMENT_TEXT`]，让下游照常运行。
//! 只有文件无法读取或无法解析时才返回错误。

use std::fmt::Display;
use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 没有可提取文本时的占位文本
pub const EMPTY_DOCUMENT_TEXT: &str = "Empty PDF";

const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从文件路径提取全文
    pub async fn extract(&self, path: &Path) -> AppResult<String> {
        let path_str = path.display().to_string();
        debug!("正在提取文本: {}", path_str);

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::pdf_open_failed(&path_str, e))?;

        self.extract_named(bytes, path_str).await
    }

    /// 从内存中的 PDF 数据提取全文
    pub async fn extract_bytes(&self, bytes: Vec<u8>) -> AppResult<String> {
        self.extract_named(bytes, "<memory>".to_string()).await
    }

    async fn extract_named(&self, bytes: Vec<u8>, name: String) -> AppResult<String> {
        tokio::task::spawn_blocking(move || -> AppResult<String> {
            let document =
                Document::load_mem(&bytes).map_err(|e| AppError::pdf_parse_failed(&name, e))?;
            Ok(extract_pages(&document))
        })
        .await?
    }
}

fn extract_pages(document: &Document) -> String {
    let pages = document
        .get_pages()
        .into_keys()
        .map(|page_number| (page_number, document.extract_text(&[page_number])));
    join_page_texts(pages)
}

/// 拼接各页文本，跳过失败页和空白页
pub fn join_page_texts<E: Display>(pages: impl IntoIterator<Item = (u32, Result<String, E>)>) -> String {
    let mut texts = Vec::new();

    for (page_number, result) in pages {
        match result {
            Ok(text) if !text.trim().is_empty() => texts.push(text.trim().to_string()),
            Ok(_) => debug!("第 {} 页没有文本，跳过", page_number),
            Err(e) => warn!("⚠️ 无法提取第 {} 页: {}", page_number, e),
        }
    }

    if texts.is_empty() {
        return EMPTY_DOCUMENT_TEXT.to_string();
    }
    texts.join(PAGE_SEPARATOR)
}
