pub mod session;

pub use session::{AnswerFeedback, QuizScore, QuizSession, ReviewEntry};
