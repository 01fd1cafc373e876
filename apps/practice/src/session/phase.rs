use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a practice session currently is.
///
/// `idle → preparing → responding → scoring → complete`; cancelling an active
/// session passes through `aborted` and settles back in `idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Preparing,
    Responding,
    Scoring,
    Complete,
    Aborted,
}

impl Phase {
    /// A session in one of these phases blocks a new start and can be cancelled.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Preparing | Phase::Responding | Phase::Scoring)
    }

    pub fn accepts_input(self) -> bool {
        self == Phase::Responding
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Preparing => "preparing",
            Phase::Responding => "responding",
            Phase::Scoring => "scoring",
            Phase::Complete => "complete",
            Phase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
