//! Step runner module - the choose / write / apply cycle.
//!
//! This module provides:
//! - The `Collaborator` trait for whatever produces each step's content
//! - `StepRunner` for driving a scheduler step by step
//! - `ScriptedCollaborator` for replaying canned outcomes

mod step_runner;

pub use step_runner::{Collaborator, CollaboratorError, ScriptedCollaborator, StepReport, StepRunner};
