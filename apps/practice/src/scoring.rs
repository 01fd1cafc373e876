//! Scoring engine: pure, deterministic quiz scoring.
//!
//! Algorithm, per slot in prompt order:
//! 1. `AnswerKey::ByIndex(i)` → correct iff the response equals `options[i]`
//! 2. `AnswerKey::ByText(s)`  → correct iff the response equals `s` exactly
//! 3. no key                  → unscored, excluded from numerator and denominator
//!
//! percentage = round(correct / total × 100), 0 when nothing is scorable.

use std::collections::BTreeMap;

use crate::models::{AnswerKey, ItemResult, Prompt, ScoreRecord, VerdictTier};
use crate::session::ResponseValue;

pub fn score(prompts: &[Prompt], responses: &BTreeMap<usize, ResponseValue>) -> ScoreRecord {
    let items: Vec<ItemResult> = prompts
        .iter()
        .enumerate()
        .map(|(slot, prompt)| judge(prompt, responses.get(&slot)))
        .collect();

    let correct = items.iter().filter(|r| **r == ItemResult::Correct).count();
    let total = items.iter().filter(|r| **r != ItemResult::Unscored).count();

    let percentage = if total > 0 {
        ((correct as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };

    ScoreRecord {
        correct,
        total,
        percentage,
        tier: VerdictTier::from_percentage(percentage),
        items,
    }
}

fn judge(prompt: &Prompt, response: Option<&ResponseValue>) -> ItemResult {
    let expected = match &prompt.answer {
        None => return ItemResult::Unscored,
        Some(AnswerKey::ByIndex(i)) => prompt.options.get(*i).map(String::as_str),
        Some(AnswerKey::ByText(text)) => Some(text.as_str()),
    };

    match (expected, response.and_then(ResponseValue::as_choice)) {
        (Some(expected), Some(given)) if expected == given => ItemResult::Correct,
        _ => ItemResult::Incorrect,
    }
}
