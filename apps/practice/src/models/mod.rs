pub mod evaluation;
pub mod prompt;
pub mod score;

pub use evaluation::SpeechEvaluation;
pub use prompt::{normalize_questions, AnswerKey, AnswerKeyPolicy, PayloadError, Prompt};
pub use score::{ItemResult, ScoreRecord, VerdictTier};
