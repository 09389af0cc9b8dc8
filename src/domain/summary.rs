//! Read-only views handed to the host.

use serde::{Deserialize, Serialize};

use crate::domain::thread::{Thread, ThreadStatus};
use crate::id::ThreadId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSummary {
    pub id: ThreadId,
    pub description: String,
    pub importance: u8,
    pub progress: u8,
    pub status: ThreadStatus,
}

impl From<&Thread> for ActiveSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id(),
            description: thread.description().to_string(),
            importance: thread.importance(),
            progress: thread.progress(),
            status: thread.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSummary {
    pub id: ThreadId,
    pub description: String,
    pub payoff_summary: String,
}

impl From<&Thread> for CompletedSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id(),
            description: thread.description().to_string(),
            payoff_summary: thread.payoff_summary().to_string(),
        }
    }
}

/// One history entry flattened with its owning thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLine {
    pub step: u64,
    pub id: ThreadId,
    pub description: String,
    pub note: String,
}
