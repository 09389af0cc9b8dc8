//! Applying step outcomes to threads.
//!
//! Amounts are clamped into the configured ranges, then progress is
//! bounded to 0..=100. Every applied outcome, static ones included, leaves
//! a history entry carrying the signed delta actually applied.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, HistoryEntry, Outcome, PROGRESS_COMPLETE, Thread, ThreadStatus};
use crate::error::{Result, SchedulerError};
use crate::id::ThreadId;
use crate::ledger::{Ledger, check_step};
use crate::scheduler::gate;

/// Clamp ranges for outcome amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressLimits {
    #[serde(rename = "advance-min")]
    pub advance_min: u8,
    #[serde(rename = "advance-max")]
    pub advance_max: u8,
    #[serde(rename = "backslide-min")]
    pub backslide_min: u8,
    #[serde(rename = "backslide-max")]
    pub backslide_max: u8,
}

impl Default for ProgressLimits {
    fn default() -> Self {
        Self {
            advance_min: 5,
            advance_max: 30,
            backslide_min: 5,
            backslide_max: 15,
        }
    }
}

impl ProgressLimits {
    /// Clamp a requested amount for the given direction.
    ///
    /// Static outcomes never move, whatever amount was asked for.
    pub fn clamp(&self, direction: Direction, amount: u8) -> u8 {
        match direction {
            Direction::Progress => clamp_between(amount, self.advance_min, self.advance_max),
            Direction::Backslide => clamp_between(amount, self.backslide_min, self.backslide_max),
            Direction::Static => 0,
        }
    }
}

/// Like `u8::clamp`, but tolerates bounds given in either order.
fn clamp_between(amount: u8, a: u8, b: u8) -> u8 {
    amount.clamp(a.min(b), a.max(b))
}

/// Applies outcomes to threads in a ledger.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    limits: ProgressLimits,
}

impl ProgressTracker {
    pub fn new(limits: ProgressLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ProgressLimits {
        &self.limits
    }

    /// Apply an outcome to a thread and return its new status.
    ///
    /// On error the ledger is left untouched.
    pub fn apply(
        &self,
        ledger: &mut Ledger,
        id: ThreadId,
        direction: Direction,
        amount: u8,
        step: u64,
        note: impl Into<String>,
    ) -> Result<ThreadStatus> {
        let updated = self.preview(ledger, id, direction, amount, step, note)?;
        let status = updated.status();
        ledger.commit(updated)?;
        Ok(status)
    }

    /// Apply an [`Outcome`] value.
    pub fn apply_outcome(&self, ledger: &mut Ledger, id: ThreadId, outcome: &Outcome, step: u64) -> Result<ThreadStatus> {
        self.apply(ledger, id, outcome.direction, outcome.amount, step, outcome.note.clone())
    }

    /// Compute the updated thread without touching the ledger.
    pub(crate) fn preview(
        &self,
        ledger: &Ledger,
        id: ThreadId,
        direction: Direction,
        amount: u8,
        step: u64,
        note: impl Into<String>,
    ) -> Result<Thread> {
        let current = ledger.get(id)?;
        match current.status() {
            ThreadStatus::Completed => return Err(SchedulerError::AlreadyCompleted(id)),
            ThreadStatus::Paused => {
                return Err(SchedulerError::InvalidState(format!(
                    "thread {id} is paused; resume it before applying outcomes"
                )));
            }
            ThreadStatus::Pending if !gate::dependencies_met(current, ledger) => {
                return Err(SchedulerError::InvalidState(format!(
                    "thread {id} is waiting on unfinished dependencies"
                )));
            }
            _ => {}
        }
        check_step(current, step)?;

        let mut thread = current.clone();
        if thread.status == ThreadStatus::Pending {
            thread.status = ThreadStatus::Active;
        }
        let before = thread.progress;
        let amount = self.limits.clamp(direction, amount);

        match direction {
            Direction::Progress => {
                thread.progress = before.saturating_add(amount).min(PROGRESS_COMPLETE);
                thread.last_advanced_step = Some(step);
                if thread.progress == PROGRESS_COMPLETE {
                    thread.status = ThreadStatus::Completed;
                } else if thread.status == ThreadStatus::Backsliding {
                    thread.status = ThreadStatus::Active;
                }
            }
            Direction::Backslide => {
                thread.progress = before.saturating_sub(amount);
                thread.last_advanced_step = Some(step);
                thread.status = ThreadStatus::Backsliding;
            }
            Direction::Static => {}
        }

        let delta = i16::from(thread.progress) - i16::from(before);
        thread.history.push(HistoryEntry::new(step, delta, thread.progress, note));
        thread.touch();

        tracing::info!(
            id = %id,
            direction = %direction,
            delta,
            progress = thread.progress,
            status = %thread.status,
            "Outcome applied"
        );
        Ok(thread)
    }
}
