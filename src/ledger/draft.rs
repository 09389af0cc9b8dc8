//! Input types for creating threads.

use crate::id::ThreadId;

/// A single thread to add, depending only on threads already in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewThread {
    pub description: String,
    pub importance: u8,
    pub dependencies: Vec<ThreadId>,
    pub payoff_summary: Option<String>,
}

impl NewThread {
    pub fn new(description: impl Into<String>, importance: u8) -> Self {
        Self {
            description: description.into(),
            importance,
            dependencies: Vec::new(),
            payoff_summary: None,
        }
    }

    /// Add dependencies on existing threads.
    pub fn depends_on(mut self, dependencies: impl IntoIterator<Item = ThreadId>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Set the intended resolution.
    pub fn with_payoff(mut self, payoff: impl Into<String>) -> Self {
        self.payoff_summary = Some(payoff.into());
        self
    }
}

/// Reference to a dependency while authoring a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyRef {
    /// A thread already in the ledger
    Existing(ThreadId),
    /// Another draft in the same batch, by key
    Draft(String),
}

impl From<ThreadId> for DependencyRef {
    fn from(id: ThreadId) -> Self {
        DependencyRef::Existing(id)
    }
}

impl From<&str> for DependencyRef {
    fn from(key: &str) -> Self {
        DependencyRef::Draft(key.to_string())
    }
}

/// One member of a batch of threads authored together.
///
/// Drafts may depend on each other by key. The batch is inserted all at once
/// or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadDraft {
    pub key: String,
    pub description: String,
    pub importance: u8,
    pub dependencies: Vec<DependencyRef>,
    pub payoff_summary: Option<String>,
}

impl ThreadDraft {
    pub fn new(key: impl Into<String>, description: impl Into<String>, importance: u8) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            importance,
            dependencies: Vec::new(),
            payoff_summary: None,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<DependencyRef>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_payoff(mut self, payoff: impl Into<String>) -> Self {
        self.payoff_summary = Some(payoff.into());
        self
    }
}

impl From<NewThread> for ThreadDraft {
    fn from(new: NewThread) -> Self {
        Self {
            key: "new".to_string(),
            description: new.description,
            importance: new.importance,
            dependencies: new.dependencies.into_iter().map(DependencyRef::Existing).collect(),
            payoff_summary: new.payoff_summary,
        }
    }
}
