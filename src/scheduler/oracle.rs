//! The decision oracle: an external chooser constrained to the shortlist.
//!
//! Any implementation works as long as it maps a shortlist to an id. The
//! selector never trusts the answer blindly; an error, a timeout or an id
//! outside the shortlist all fall back to the top-ranked candidate.

use async_trait::async_trait;
use std::time::Duration;

use crate::id::ThreadId;
use crate::scheduler::select::Candidate;

/// Why an oracle answer was not used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle chose {0}, which is not on the shortlist")]
    InvalidChoice(ThreadId),
}

/// External decision function over a ranked shortlist.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Pick one id from `shortlist` (ranked best first, never empty).
    async fn choose(&self, shortlist: &[Candidate]) -> Result<ThreadId, OracleError>;
}

/// Purely algorithmic oracle: always the top-ranked candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopRanked;

#[async_trait]
impl Oracle for TopRanked {
    async fn choose(&self, shortlist: &[Candidate]) -> Result<ThreadId, OracleError> {
        shortlist
            .first()
            .map(|c| c.id)
            .ok_or_else(|| OracleError::Unavailable("empty shortlist".to_string()))
    }
}

/// Adapter turning a plain closure into an oracle.
pub struct FnOracle<F> {
    f: F,
}

impl<F> FnOracle<F>
where
    F: Fn(&[Candidate]) -> Result<ThreadId, OracleError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Oracle for FnOracle<F>
where
    F: Fn(&[Candidate]) -> Result<ThreadId, OracleError> + Send + Sync,
{
    async fn choose(&self, shortlist: &[Candidate]) -> Result<ThreadId, OracleError> {
        (self.f)(shortlist)
    }
}
