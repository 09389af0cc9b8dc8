//! Selector for choosing which thread the next step focuses on.
//!
//! Each step the selector:
//! - Runs the dependency gate (promoting ready pending threads)
//! - Synthesizes one thread if nothing is eligible
//! - Scores every eligible thread and ranks them (score desc, id asc)
//! - Truncates to the requested shortlist size
//! - Lets the oracle pick from the shortlist, falling back to the top entry

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

use crate::config::SelectionConfig;
use crate::domain::{Thread, ThreadStatus};
use crate::error::{Result, SchedulerError};
use crate::id::ThreadId;
use crate::ledger::Ledger;
use crate::scheduler::factory::ThreadFactory;
use crate::scheduler::gate;
use crate::scheduler::oracle::{Oracle, OracleError};
use crate::scheduler::priority::ScoringConfig;

/// One ranked, eligible thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ThreadId,
    pub description: String,
    pub importance: u8,
    pub progress: u8,
    pub status: ThreadStatus,
    pub score: f64,
}

impl Candidate {
    fn scored(thread: &Thread, score: f64) -> Self {
        Self {
            id: thread.id(),
            description: thread.description().to_string(),
            importance: thread.importance(),
            progress: thread.progress(),
            status: thread.status(),
            score,
        }
    }
}

/// Ranked candidates for one step, plus what the gate changed to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortlist {
    pub step: u64,
    /// Best first; never empty
    pub candidates: Vec<Candidate>,
    /// Pending threads promoted while building this shortlist
    pub promoted: Vec<ThreadId>,
    /// Thread synthesized because nothing was eligible
    pub synthesized: Option<ThreadId>,
}

impl Shortlist {
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.candidates.iter().any(|c| c.id == id)
    }

    pub fn ids(&self) -> Vec<ThreadId> {
        self.candidates.iter().map(|c| c.id).collect()
    }

    /// Ids whose stored record changed while building the shortlist.
    pub fn touched(&self) -> Vec<ThreadId> {
        self.promoted.iter().copied().chain(self.synthesized).collect()
    }
}

/// How the chosen id was arrived at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ChoiceSource {
    /// No oracle supplied; top of the shortlist
    Algorithmic,
    /// The oracle's answer was accepted
    Oracle,
    /// The oracle failed; top of the shortlist
    Fallback { reason: String },
}

/// Result of a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub id: ThreadId,
    pub step: u64,
    pub shortlist: Vec<Candidate>,
    pub source: ChoiceSource,
    pub synthesized: Option<ThreadId>,
}

/// Selector for choosing the thread to advance.
#[derive(Debug, Clone)]
pub struct Selector {
    scoring: ScoringConfig,
    factory: ThreadFactory,
    oracle_timeout: Duration,
}

impl Selector {
    /// Create a Selector with default configuration.
    pub fn new() -> Self {
        Self::from_config(&ScoringConfig::default(), &SelectionConfig::default())
    }

    pub fn from_config(scoring: &ScoringConfig, selection: &SelectionConfig) -> Self {
        Self {
            scoring: scoring.clone(),
            factory: ThreadFactory::from_config(selection),
            oracle_timeout: Duration::from_millis(selection.oracle_timeout_ms),
        }
    }

    /// Use custom scoring weights.
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Use a custom thread factory for synthesis.
    pub fn with_factory(mut self, factory: ThreadFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Bound how long the oracle may take.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn oracle_timeout(&self) -> Duration {
        self.oracle_timeout
    }

    /// Rank the currently eligible threads without mutating anything.
    pub fn rank(&self, ledger: &Ledger, step: u64) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = ledger
            .all_active()
            .into_iter()
            .filter(|t| gate::is_eligible(t, ledger))
            .map(|t| Candidate::scored(t, self.scoring.score(t, step)))
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }

    /// Build the shortlist for `step`.
    ///
    /// A `k` of zero is treated as one. May promote pending threads and
    /// synthesize at most one new thread.
    pub fn shortlist(&self, ledger: &mut Ledger, step: u64, k: usize) -> Result<Shortlist> {
        let evaluation = gate::evaluate(ledger)?;

        let synthesized = if evaluation.eligible.is_empty() {
            tracing::debug!(step, "No eligible threads, synthesizing");
            Some(self.factory.synthesize(ledger)?)
        } else {
            None
        };

        let mut candidates = self.rank(ledger, step);
        candidates.truncate(k.max(1));

        tracing::debug!(
            step,
            k,
            shortlist = ?candidates.iter().map(|c| c.id.get()).collect::<Vec<_>>(),
            "Shortlist built"
        );

        Ok(Shortlist {
            step,
            candidates,
            promoted: evaluation.promoted,
            synthesized,
        })
    }

    /// Turn a shortlist into a choice, consulting the oracle if given.
    ///
    /// Any oracle problem falls back to the top candidate; only an empty
    /// shortlist is an error.
    pub async fn resolve(&self, shortlist: Shortlist, oracle: Option<&dyn Oracle>) -> Result<Choice> {
        let Some(top) = shortlist.top().map(|c| c.id) else {
            return Err(SchedulerError::InvalidState(format!(
                "empty shortlist at step {}",
                shortlist.step
            )));
        };

        let (id, source) = match oracle {
            None => (top, ChoiceSource::Algorithmic),
            Some(oracle) => match self.consult(oracle, &shortlist).await {
                Ok(id) => (id, ChoiceSource::Oracle),
                Err(e) => {
                    tracing::warn!(step = shortlist.step, error = %e, fallback = %top, "Oracle failed, using top candidate");
                    (top, ChoiceSource::Fallback { reason: e.to_string() })
                }
            },
        };

        tracing::info!(step = shortlist.step, id = %id, source = ?source, "Thread chosen");

        Ok(Choice {
            id,
            step: shortlist.step,
            shortlist: shortlist.candidates,
            source,
            synthesized: shortlist.synthesized,
        })
    }

    /// Shortlist and resolve in one go.
    pub async fn choose(
        &self,
        ledger: &mut Ledger,
        step: u64,
        k: usize,
        oracle: Option<&dyn Oracle>,
    ) -> Result<Choice> {
        let shortlist = self.shortlist(ledger, step, k)?;
        self.resolve(shortlist, oracle).await
    }

    async fn consult(&self, oracle: &dyn Oracle, shortlist: &Shortlist) -> std::result::Result<ThreadId, OracleError> {
        let picked = tokio::time::timeout(self.oracle_timeout, oracle.choose(&shortlist.candidates))
            .await
            .map_err(|_| OracleError::Timeout(self.oracle_timeout))??;

        if shortlist.contains(picked) {
            Ok(picked)
        } else {
            Err(OracleError::InvalidChoice(picked))
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by score descending, ties by ascending id.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
}
