//! Step runner: choose, hand off to the collaborator, apply the outcome.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{Outcome, Thread, ThreadStatus};
use crate::error::Result;
use crate::scheduler::{Choice, Oracle, ThreadScheduler};

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Collaborator failed: {0}")]
    Failed(String),
}

/// Whatever writes the story for the chosen thread.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Produce this step's content for `thread` and report how it moved.
    async fn advance(&self, choice: &Choice, thread: &Thread) -> std::result::Result<Outcome, CollaboratorError>;
}

/// Record of one completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: u64,
    pub choice: Choice,
    /// The outcome actually applied
    pub outcome: Outcome,
    /// Status of the chosen thread after the outcome
    pub status: ThreadStatus,
    /// Set when the collaborator failed and a static outcome was applied instead
    pub collaborator_error: Option<String>,
}

/// Drives the scheduler one step at a time.
pub struct StepRunner<C: Collaborator> {
    collaborator: Arc<C>,
    oracle: Option<Arc<dyn Oracle>>,
}

impl<C: Collaborator> StepRunner<C> {
    pub fn new(collaborator: Arc<C>) -> Self {
        Self {
            collaborator,
            oracle: None,
        }
    }

    /// Let `oracle` pick from each step's shortlist.
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Run a single step.
    ///
    /// A collaborator failure is not fatal: the chosen thread gets a static
    /// outcome so the step still lands in its history.
    pub async fn run_step(&self, scheduler: &mut ThreadScheduler, step: u64) -> Result<StepReport> {
        let k = scheduler.shortlist_size();
        let choice = scheduler.choose(step, k, self.oracle.as_deref()).await?;
        let thread = scheduler.thread(choice.id)?.clone();

        let (outcome, collaborator_error) = match self.collaborator.advance(&choice, &thread).await {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                tracing::warn!(step, id = %choice.id, error = %e, "Collaborator failed, recording static step");
                (Outcome::stay(e.to_string()), Some(e.to_string()))
            }
        };

        let status = scheduler.apply_outcome(choice.id, &outcome, step)?;
        tracing::info!(step, id = %choice.id, direction = %outcome.direction, status = %status, "Step complete");

        Ok(StepReport {
            step,
            choice,
            outcome,
            status,
            collaborator_error,
        })
    }

    /// Run `count` consecutive steps starting at `from`.
    pub async fn run_steps(&self, scheduler: &mut ThreadScheduler, from: u64, count: u64) -> Result<Vec<StepReport>> {
        let mut reports = Vec::new();
        for step in from..from.saturating_add(count) {
            reports.push(self.run_step(scheduler, step).await?);
        }
        Ok(reports)
    }
}

/// Collaborator that replays a fixed list of results.
///
/// Once the script runs out every step is static.
#[derive(Debug, Default)]
pub struct ScriptedCollaborator {
    script: Mutex<VecDeque<std::result::Result<Outcome, CollaboratorError>>>,
}

impl ScriptedCollaborator {
    pub fn new(script: Vec<std::result::Result<Outcome, CollaboratorError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    /// Script made only of successful outcomes.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self::new(outcomes.into_iter().map(Ok).collect())
    }
}

#[async_trait]
impl Collaborator for ScriptedCollaborator {
    async fn advance(&self, _choice: &Choice, _thread: &Thread) -> std::result::Result<Outcome, CollaboratorError> {
        let next = self
            .script
            .lock()
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?
            .pop_front();
        next.unwrap_or_else(|| Ok(Outcome::stay("nothing scripted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::ledger::NewThread;
    use crate::scheduler::TopRanked;

    #[tokio::test]
    async fn test_run_step_applies_outcome() {
        let mut scheduler = ThreadScheduler::default();
        let id = scheduler.add_thread(NewThread::new("The duel", 8)).unwrap();

        let runner = StepRunner::new(Arc::new(ScriptedCollaborator::from_outcomes([Outcome::progress(
            20,
            "first blood",
        )])));
        let report = runner.run_step(&mut scheduler, 1).await.unwrap();

        assert_eq!(report.choice.id, id);
        assert_eq!(report.status, ThreadStatus::Active);
        assert!(report.collaborator_error.is_none());
        assert_eq!(scheduler.thread(id).unwrap().progress(), 20);
    }

    #[tokio::test]
    async fn test_collaborator_error_becomes_static() {
        let mut scheduler = ThreadScheduler::default();
        let id = scheduler.add_thread(NewThread::new("The duel", 8)).unwrap();

        let runner = StepRunner::new(Arc::new(ScriptedCollaborator::new(vec![Err(
            CollaboratorError::Failed("model overloaded".to_string()),
        )])));
        let report = runner.run_step(&mut scheduler, 1).await.unwrap();

        assert_eq!(report.outcome.direction, Direction::Static);
        assert!(report.collaborator_error.unwrap().contains("model overloaded"));
        let thread = scheduler.thread(id).unwrap();
        assert_eq!(thread.progress(), 0);
        assert_eq!(thread.history().len(), 1);
    }

    #[tokio::test]
    async fn test_run_steps_until_completion_then_synthesizes() {
        let mut scheduler = ThreadScheduler::default();
        let id = scheduler.add_thread(NewThread::new("Short story", 5)).unwrap();

        let runner = StepRunner::new(Arc::new(ScriptedCollaborator::from_outcomes(
            std::iter::repeat_n(Outcome::progress(30, "push"), 4),
        )))
        .with_oracle(Arc::new(TopRanked));
        let reports = runner.run_steps(&mut scheduler, 1, 5).await.unwrap();

        assert_eq!(reports.len(), 5);
        assert_eq!(reports[3].status, ThreadStatus::Completed);
        assert!(reports[..4].iter().all(|r| r.choice.id == id));

        // Nothing left to work on at step 5
        let last = &reports[4];
        assert!(last.choice.synthesized.is_some());
        assert_eq!(last.outcome.direction, Direction::Static);
        assert_eq!(scheduler.completed_summary().len(), 1);
    }
}
