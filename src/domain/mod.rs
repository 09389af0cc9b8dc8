//! Domain types for threadloom
//!
//! - Thread: the narrative promise with status, progress, dependencies and history
//! - Outcome: what the content collaborator reports after a step
//! - Summaries: flattened read-only views for the host

pub mod outcome;
pub mod summary;
pub mod thread;

pub use outcome::{Direction, Outcome};
pub use summary::{ActiveSummary, CompletedSummary, HistoryLine};
pub use thread::{HistoryEntry, PROGRESS_COMPLETE, Thread, ThreadStatus};
