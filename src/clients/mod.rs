pub mod llm_client;
pub mod question_source;
pub mod segmenter;

pub use llm_client::LlmClient;
pub use question_source::{OpenAiQuestionSource, StructuredGenerator};
pub use segmenter::{LlmSegmenter, Segmentation, Segmenter};
