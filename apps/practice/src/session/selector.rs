//! Prompt selector: uniform random draws from a catalog with a bounded
//! re-roll budget.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::catalog::Catalog;
use crate::models::Prompt;

pub const DEFAULT_REROLL_BUDGET: u32 = 3;

/// Remaining topic changes for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerollBudget {
    remaining: u32,
}

impl RerollBudget {
    pub fn new(remaining: u32) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spends one re-roll. Returns false, leaving the budget alone, once exhausted.
    pub fn try_spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl Default for RerollBudget {
    fn default() -> Self {
        Self::new(DEFAULT_REROLL_BUDGET)
    }
}

pub struct PromptSelector {
    catalog: Catalog,
    rng: StdRng,
}

impl PromptSelector {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible draws, for tests and replays.
    pub fn seeded(catalog: Catalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Draws uniformly from the catalog, skipping `excluding` when the catalog
    /// has at least two entries.
    pub fn choose(&mut self, excluding: Option<&Prompt>) -> Prompt {
        let prompts = self.catalog.prompts();
        let pool: Vec<&Prompt> = match excluding {
            Some(excluded) if prompts.len() >= 2 => {
                prompts.iter().filter(|p| p.text != excluded.text).collect()
            }
            _ => prompts.iter().collect(),
        };
        // A catalog made entirely of duplicates of `excluding` leaves nothing to filter to.
        let pool = if pool.is_empty() {
            prompts.iter().collect()
        } else {
            pool
        };
        pool.choose(&mut self.rng)
            .map(|p| (*p).clone())
            .unwrap_or_else(|| prompts[0].clone())
    }

    /// Replaces `current` with a different prompt while budget remains.
    /// `None` means the budget is spent; the caller keeps its prompt.
    pub fn reroll(&mut self, current: &Prompt, budget: &mut RerollBudget) -> Option<Prompt> {
        if !budget.try_spend() {
            return None;
        }
        Some(self.choose(Some(current)))
    }
}
