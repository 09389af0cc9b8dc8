//! Urgency scoring for thread selection.
//!
//! Threads are scored by:
//! - Importance (x10)
//! - Staleness (+5 per step since last progress/backslide, capped at +50)
//! - Never-started bonus (+30 until the first progress/backslide)
//! - Remaining distance (+0.5 per point left to 100)
//!
//! Scoring is pure: identical `(thread, step)` inputs give identical output.

use serde::{Deserialize, Serialize};

use crate::domain::Thread;

/// Score per point of importance.
pub const IMPORTANCE_WEIGHT: f64 = 10.0;

/// Staleness bonus per step without movement.
pub const STALENESS_PER_STEP: f64 = 5.0;
/// Maximum staleness bonus.
pub const STALENESS_CAP: f64 = 50.0;

/// Flat bonus for threads that have never moved.
pub const FRESH_BONUS: f64 = 30.0;

/// Score per point of remaining progress.
pub const REMAINING_WEIGHT: f64 = 0.5;

/// Steps since the thread last moved.
///
/// A thread that never moved is as stale as the current step is old.
pub fn staleness(thread: &Thread, current_step: u64) -> u64 {
    current_step.saturating_sub(thread.last_advanced_step().unwrap_or(0))
}

/// Score a thread with the default weights.
pub fn score(thread: &Thread, current_step: u64) -> f64 {
    ScoringConfig::default().score(thread, current_step)
}

/// Scoring weights (for customization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(rename = "importance-weight")]
    pub importance_weight: f64,
    #[serde(rename = "staleness-per-step")]
    pub staleness_per_step: f64,
    #[serde(rename = "staleness-cap")]
    pub staleness_cap: f64,
    #[serde(rename = "fresh-bonus")]
    pub fresh_bonus: f64,
    #[serde(rename = "remaining-weight")]
    pub remaining_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            importance_weight: IMPORTANCE_WEIGHT,
            staleness_per_step: STALENESS_PER_STEP,
            staleness_cap: STALENESS_CAP,
            fresh_bonus: FRESH_BONUS,
            remaining_weight: REMAINING_WEIGHT,
        }
    }
}

impl ScoringConfig {
    /// Calculate the urgency score with these weights.
    pub fn score(&self, thread: &Thread, current_step: u64) -> f64 {
        let mut score = f64::from(thread.importance()) * self.importance_weight;

        // Staleness bonus, capped so one old thread cannot dominate forever
        let stale = staleness(thread, current_step) as f64;
        score += (stale * self.staleness_per_step).min(self.staleness_cap);

        // Never-started bonus keeps new threads from starving
        if thread.last_advanced_step().is_none() {
            score += self.fresh_bonus;
        }

        score += f64::from(thread.remaining()) * self.remaining_weight;

        score
    }
}
