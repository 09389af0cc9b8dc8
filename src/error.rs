//! Error types for threadloom
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::id::ThreadId;

/// All error types that can occur while scheduling threads
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Thread not present in the ledger
    #[error("Thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// A dependency names a thread the ledger has never seen
    #[error("Unknown dependency: {dependency}")]
    UnknownDependency { dependency: String },

    /// Inserting the thread(s) would close a dependency cycle
    #[error("Dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// A thread listed itself as a dependency
    #[error("Thread cannot depend on itself: {0}")]
    SelfDependency(String),

    /// Completion is terminal
    #[error("Thread already completed: {0}")]
    AlreadyCompleted(ThreadId),

    /// Importance outside 1..=10
    #[error("Importance must be between 1 and 10, got {0}")]
    InvalidImportance(u8),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// History steps must strictly increase per thread
    #[error("Step {step} for thread {id} is not after its last recorded step {last}")]
    StepOutOfOrder { id: ThreadId, step: u64, last: u64 },

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulerError::Storage(err.to_string())
    }
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
