//! Scheduler module for thread selection and progress tracking.
//!
//! This module provides:
//! - **Priority scoring**: Urgency from importance, staleness, freshness and
//!   remaining distance.
//! - **Dependency gate**: Which threads may be selected, and promotion of
//!   pending threads whose dependencies have completed.
//! - **Selector**: Ranked shortlist per step, oracle consultation with
//!   fallback, synthesis when nothing is eligible.
//! - **ProgressTracker**: Clamped progress/backslide application and history.
//! - **ThreadScheduler**: The facade hosts talk to, with write-through
//!   persistence.
//!
//! # Example
//!
//! ```ignore
//! use threadloom::config::SchedulerConfig;
//! use threadloom::ledger::NewThread;
//! use threadloom::scheduler::ThreadScheduler;
//!
//! let mut scheduler = ThreadScheduler::new(&SchedulerConfig::default());
//! let id = scheduler.add_thread(NewThread::new("The betrayal", 9))?;
//!
//! let choice = scheduler.choose(1, 3, None).await?;
//! scheduler.apply(choice.id, Direction::Progress, 20, 1, "The spy is unmasked")?;
//! ```

mod factory;
pub mod gate;
mod manager;
mod oracle;
pub mod priority;
mod select;
mod tracker;

pub use factory::ThreadFactory;
pub use gate::Evaluation;
pub use manager::{SharedScheduler, ThreadScheduler};
pub use oracle::{FnOracle, Oracle, OracleError, TopRanked};
pub use priority::ScoringConfig;
pub use select::{Candidate, Choice, ChoiceSource, Selector, Shortlist, sort_candidates};
pub use tracker::{ProgressLimits, ProgressTracker};
