//! Local stand-in for the speech evaluation service.
//!
//! Waits a fixed delay and returns a randomized but well-formed evaluation.
//! It does not look at the recording. Swap in `PracticeClient` once the
//! backend grows a real `/vocab/evaluate`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::client::{ServiceError, SpeechEvaluator};
use crate::models::SpeechEvaluation;

pub const PLACEHOLDER_DELAY: Duration = Duration::from_secs(2);

const VERDICTS: &[&str] = &["Excellent", "Good", "Average", "Needs Improvement"];

const STRENGTHS: &[&str] = &[
    "Clear articulation of thoughts",
    "Good use of professional vocabulary",
    "Structured response with clear beginning and end",
    "Appropriate pace and tone",
];

const IMPROVEMENTS: &[&str] = &[
    "Could use more industry-specific terminology",
    "Practice varying sentence structure",
    "Include more quantifiable achievements",
    "Work on reducing filler words",
];

const FEEDBACK: &str = "Good overall response with clear structure. Practice with more technical vocabulary to improve scores.";

const WORD_CLOUD: &[&str] = &["communication", "teamwork", "problem-solving", "adaptability"];

pub struct PlaceholderEvaluator {
    delay: Duration,
    seed: Option<u64>,
}

impl PlaceholderEvaluator {
    pub fn new() -> Self {
        Self {
            delay: PLACEHOLDER_DELAY,
            seed: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Same evaluation on every call.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn draw(&self) -> SpeechEvaluation {
        match self.seed {
            Some(seed) => placeholder_evaluation(&mut StdRng::seed_from_u64(seed)),
            None => placeholder_evaluation(&mut rand::thread_rng()),
        }
    }
}

impl Default for PlaceholderEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEvaluator for PlaceholderEvaluator {
    async fn evaluate(&self, topic: &str, recording: Bytes) -> Result<SpeechEvaluation, ServiceError> {
        debug!(topic, bytes = recording.len(), "Placeholder evaluation");
        let evaluation = self.draw();
        tokio::time::sleep(self.delay).await;
        Ok(evaluation)
    }
}

fn placeholder_evaluation(rng: &mut impl Rng) -> SpeechEvaluation {
    SpeechEvaluation {
        score: rng.gen_range(60..100),
        verdict: VERDICTS
            .choose(rng)
            .copied()
            .unwrap_or("Good")
            .to_string(),
        strengths: STRENGTHS.iter().map(|s| s.to_string()).collect(),
        improvements: IMPROVEMENTS.iter().map(|s| s.to_string()).collect(),
        interviewer_feedback: FEEDBACK.to_string(),
        word_cloud: WORD_CLOUD.iter().map(|s| s.to_string()).collect(),
        fluency_score: Some(rng.gen_range(70..100)),
        vocabulary_score: Some(rng.gen_range(70..100)),
        coherence_score: Some(rng.gen_range(70..100)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let eval = placeholder_evaluation(&mut rng);
            assert!((60..100).contains(&eval.score));
            assert!(VERDICTS.contains(&eval.verdict.as_str()));
            for sub in [eval.fluency_score, eval.vocabulary_score, eval.coherence_score] {
                assert!((70..100).contains(&sub.unwrap()));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_before_answering() {
        let evaluator = PlaceholderEvaluator::new().seeded(1);
        let started = tokio::time::Instant::now();
        let first = evaluator.evaluate("t", Bytes::new()).await.unwrap();
        assert_eq!(started.elapsed(), PLACEHOLDER_DELAY);
        let second = evaluator.evaluate("t", Bytes::new()).await.unwrap();
        assert_eq!(first, second);
    }
}
