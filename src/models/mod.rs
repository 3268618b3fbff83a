pub mod chunk;
pub mod ledger;
pub mod question;
pub mod quiz;
pub mod usage;

pub use chunk::Chunk;
pub use ledger::{Pricing, UsageLedger};
pub use question::{Difficulty, OptionLabel, Question, QuestionValidationError, RawQuestion};
pub use quiz::{GenerationResult, QuizMetadata, QuizResult};
pub use usage::TokenUsage;
