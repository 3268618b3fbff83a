/// 文档分块
///
/// 一段连续的原文，由分块器一次性生成，之后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// 在文档中的顺序（从 0 开始）
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 字符数（非字节数）
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
