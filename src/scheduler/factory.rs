//! Thread creation on demand.
//!
//! Authored threads go straight through the ledger. When the selector finds
//! nothing eligible, the factory synthesizes one generic, dependency-free
//! thread so every step still has something to work on.

use crate::config::SelectionConfig;
use crate::domain::Thread;
use crate::error::Result;
use crate::id::ThreadId;
use crate::ledger::{Ledger, ThreadDraft};

/// Key used for the single-draft batch of a synthesized thread.
const SYNTHESIZED_KEY: &str = "synthesized";

#[derive(Debug, Clone)]
pub struct ThreadFactory {
    importance: u8,
    description: String,
    payoff: String,
}

impl Default for ThreadFactory {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}

impl ThreadFactory {
    pub fn new(importance: u8, description: impl Into<String>, payoff: impl Into<String>) -> Self {
        Self {
            importance,
            description: description.into(),
            payoff: payoff.into(),
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(
            config.synthesized_importance,
            config.synthesized_description.clone(),
            config.synthesized_payoff.clone(),
        )
    }

    /// Build (but do not insert) a synthesized thread record.
    pub(crate) fn prepare(&self, ledger: &Ledger) -> Result<Thread> {
        let draft = ThreadDraft::new(SYNTHESIZED_KEY, self.description.clone(), self.importance)
            .with_payoff(self.payoff.clone());
        let mut threads = ledger.prepare(vec![draft])?;
        let mut thread = threads.remove(0);
        thread.synthesized = true;
        Ok(thread)
    }

    /// Synthesize one thread directly into the ledger.
    pub fn synthesize(&self, ledger: &mut Ledger) -> Result<ThreadId> {
        let thread = self.prepare(ledger)?;
        let id = thread.id();
        ledger.insert_prepared(vec![thread]);
        tracing::info!(id = %id, importance = self.importance, "Synthesized thread");
        Ok(id)
    }
}
