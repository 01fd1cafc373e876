use serde::{Deserialize, Serialize};

use crate::models::score::VerdictTier;

/// Feedback on a recorded spoken answer.
/// Deserialised leniently: the backend may omit any of the list fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechEvaluation {
    pub score: u32,
    pub verdict: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub interviewer_feedback: String,
    #[serde(default)]
    pub word_cloud: Vec<String>,
    pub fluency_score: Option<u32>,
    pub vocabulary_score: Option<u32>,
    pub coherence_score: Option<u32>,
}

impl SpeechEvaluation {
    pub fn tier(&self) -> VerdictTier {
        VerdictTier::from_percentage(self.score)
    }
}
