//! Threadloom - a narrative thread scheduler
//!
//! Threadloom keeps a ledger of open story threads (promises made to the
//! reader), decides which one each generation step should focus on, and
//! tracks how each thread moves toward its payoff.

pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod ledger;
pub mod runner;
pub mod scheduler;
pub mod storage;

pub use config::{SchedulerConfig, load_config};
pub use domain::{Direction, Outcome, Thread, ThreadStatus};
pub use error::{Result, SchedulerError};
pub use id::ThreadId;
pub use ledger::{Ledger, NewThread, ThreadDraft};
pub use scheduler::{Choice, Oracle, SharedScheduler, ThreadScheduler};
