pub mod chunker;
pub mod question_generator;
pub mod text_extractor;
pub mod token_counter;
pub mod usage_tracker;

pub use chunker::Chunker;
pub use question_generator::QuestionGenerator;
pub use text_extractor::TextExtractor;
pub use token_counter::TokenCounter;
pub use usage_tracker::UsageTracker;
