//! Thread record and lifecycle types.
//!
//! A `Thread` is one narrative promise the story owes its reader. Records are
//! created by the ledger and mutated only through the progress tracker, the
//! dependency gate (pending promotion) and the pause/resume path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::id::{ThreadId, now_ms};

/// Progress value at which a thread is finished.
pub const PROGRESS_COMPLETE: u8 = 100;

/// The thread record stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    /// Ledger-assigned identity, never reused
    pub(crate) id: ThreadId,

    /// What the thread represents narratively
    pub(crate) description: String,

    /// Scoring weight, 1..=10
    pub(crate) importance: u8,

    /// Current lifecycle status
    pub(crate) status: ThreadStatus,

    /// 0..=100
    pub(crate) progress: u8,

    /// Threads that must complete before this one can be selected
    pub(crate) dependencies: BTreeSet<ThreadId>,

    /// Step of the last progress/backslide event (None = never advanced)
    pub(crate) last_advanced_step: Option<u64>,

    /// Append-only audit trail
    pub(crate) history: Vec<HistoryEntry>,

    /// Intended resolution, context only
    pub(crate) payoff_summary: String,

    /// Created by the factory because nothing else was eligible
    #[serde(default)]
    pub(crate) synthesized: bool,

    /// Unix timestamp in milliseconds
    pub(crate) created_at: i64,

    /// Unix timestamp in milliseconds
    pub(crate) updated_at: i64,
}

impl Thread {
    pub(crate) fn new(
        id: ThreadId,
        description: String,
        importance: u8,
        dependencies: BTreeSet<ThreadId>,
        payoff_summary: String,
        status: ThreadStatus,
    ) -> Self {
        let now = now_ms();
        Self {
            id,
            description,
            importance,
            status,
            progress: 0,
            dependencies,
            last_advanced_step: None,
            history: Vec::new(),
            payoff_summary,
            synthesized: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn importance(&self) -> u8 {
        self.importance
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn dependencies(&self) -> &BTreeSet<ThreadId> {
        &self.dependencies
    }

    pub fn last_advanced_step(&self) -> Option<u64> {
        self.last_advanced_step
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn payoff_summary(&self) -> &str {
        &self.payoff_summary
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Step of the most recent history entry, if any.
    pub fn last_recorded_step(&self) -> Option<u64> {
        self.history.last().map(|entry| entry.step)
    }

    /// Percentage left until completion.
    pub fn remaining(&self) -> u8 {
        PROGRESS_COMPLETE.saturating_sub(self.progress)
    }

    /// Update the timestamp to now.
    pub(crate) fn touch(&mut self) {
        self.updated_at = now_ms();
    }

    /// Check the record-level invariants.
    ///
    /// Progress stays within 0..=100, completion and full progress move
    /// together, and history steps strictly increase.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.progress > PROGRESS_COMPLETE {
            return Err(format!("thread {} progress {} exceeds 100", self.id, self.progress));
        }
        let complete = self.status == ThreadStatus::Completed;
        if complete != (self.progress == PROGRESS_COMPLETE) {
            return Err(format!(
                "thread {} status {} disagrees with progress {}",
                self.id, self.status, self.progress
            ));
        }
        if !(1..=10).contains(&self.importance) {
            return Err(format!("thread {} importance {} out of range", self.id, self.importance));
        }
        if self.dependencies.contains(&self.id) {
            return Err(format!("thread {} depends on itself", self.id));
        }
        let ordered = self.history.windows(2).all(|pair| pair[0].step < pair[1].step);
        if !ordered {
            return Err(format!("thread {} history steps are not strictly increasing", self.id));
        }
        Ok(())
    }
}

/// Thread status state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// Waiting on dependencies
    Pending,
    /// Eligible and moving forward
    Active,
    /// Last outcome was a regression
    Backsliding,
    /// Reached 100, terminal
    Completed,
    /// Administratively hidden from selection
    Paused,
}

impl ThreadStatus {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Pending => "pending",
            ThreadStatus::Active => "active",
            ThreadStatus::Backsliding => "backsliding",
            ThreadStatus::Completed => "completed",
            ThreadStatus::Paused => "paused",
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ThreadStatus::Completed)
    }

    /// Whether the status itself permits selection (dependencies aside).
    pub fn is_selectable(&self) -> bool {
        matches!(
            self,
            ThreadStatus::Pending | ThreadStatus::Active | ThreadStatus::Backsliding
        )
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ThreadStatus::Pending),
            "active" => Ok(ThreadStatus::Active),
            "backsliding" => Ok(ThreadStatus::Backsliding),
            "completed" => Ok(ThreadStatus::Completed),
            "paused" => Ok(ThreadStatus::Paused),
            other => Err(format!("unknown thread status: {}", other)),
        }
    }
}

/// One audit-trail record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Generation step the entry belongs to
    pub step: u64,
    /// Signed change applied to progress (0 for static outcomes)
    pub delta: i16,
    /// Progress after the change
    pub resulting_progress: u8,
    /// Free-form note from the collaborator
    pub note: String,
    /// Unix timestamp in milliseconds
    pub recorded_at: i64,
}

impl HistoryEntry {
    pub(crate) fn new(step: u64, delta: i16, resulting_progress: u8, note: impl Into<String>) -> Self {
        Self {
            step,
            delta,
            resulting_progress,
            note: note.into(),
            recorded_at: now_ms(),
        }
    }
}
