use serde::{Deserialize, Serialize};

/// Qualitative band for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTier {
    High,
    Medium,
    Low,
}

impl VerdictTier {
    /// ≥80 high, ≥60 medium, else low.
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            p if p >= 80 => VerdictTier::High,
            p if p >= 60 => VerdictTier::Medium,
            _ => VerdictTier::Low,
        }
    }
}

/// Outcome of a single quiz slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemResult {
    Correct,
    Incorrect,
    /// No answer key; left out of the percentage.
    Unscored,
}

/// Final score of a quiz attempt. Derived only, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub correct: usize,
    /// Number of scorable items.
    pub total: usize,
    pub percentage: u32,
    pub tier: VerdictTier,
    /// One entry per prompt, in prompt order.
    pub items: Vec<ItemResult>,
}
