//! ThreadScheduler: the host-facing facade over ledger, selector and tracker.
//!
//! Every mutation follows the same shape:
//! 1. Compute the updated records without touching the ledger
//! 2. Write them to the store (if any)
//! 3. Commit them to the in-memory ledger
//!
//! A failure at any point leaves both sides unchanged.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::SchedulerConfig;
use crate::domain::{ActiveSummary, CompletedSummary, Direction, HistoryLine, Outcome, Thread, ThreadStatus};
use crate::error::{Result, SchedulerError};
use crate::id::ThreadId;
use crate::ledger::{Ledger, NewThread, ThreadDraft};
use crate::scheduler::gate;
use crate::scheduler::oracle::Oracle;
use crate::scheduler::select::{Candidate, Choice, Selector, Shortlist};
use crate::scheduler::tracker::ProgressTracker;
use crate::storage::{ThreadStore, open_store};

/// Owns the ledger and runs every scheduler operation against it.
pub struct ThreadScheduler {
    ledger: Ledger,
    selector: Selector,
    tracker: ProgressTracker,
    shortlist_size: usize,
    store: Option<Box<dyn ThreadStore>>,
}

impl std::fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("threads", &self.ledger.len())
            .field("shortlist_size", &self.shortlist_size)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}

impl ThreadScheduler {
    /// In-memory scheduler; nothing is persisted.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            ledger: Ledger::new(),
            selector: Selector::from_config(&config.scoring, &config.selection),
            tracker: ProgressTracker::new(config.progress.clone()),
            shortlist_size: config.selection.shortlist_size,
            store: None,
        }
    }

    /// Open the configured store for `project_dir` and restore its ledger.
    pub fn open(config: &SchedulerConfig, project_dir: &Path) -> Result<Self> {
        match open_store(&config.storage, project_dir)? {
            Some(store) => Self::with_store(config, store),
            None => Ok(Self::new(config)),
        }
    }

    /// Scheduler backed by `store`, restoring whatever it holds.
    pub fn with_store(config: &SchedulerConfig, store: Box<dyn ThreadStore>) -> Result<Self> {
        let ledger = Ledger::restore(store.load_all()?)?;
        tracing::info!(threads = ledger.len(), "Restored ledger from store");

        let mut scheduler = Self::new(config);
        scheduler.ledger = ledger;
        scheduler.store = Some(store);
        Ok(scheduler)
    }

    /// Register one authored thread.
    pub fn add_thread(&mut self, new: NewThread) -> Result<ThreadId> {
        let ids = self.add_threads(vec![new.into()])?;
        ids.into_iter()
            .next()
            .ok_or_else(|| SchedulerError::InvalidState("no thread created".to_string()))
    }

    /// Register a batch of threads atomically.
    ///
    /// Drafts may depend on each other by key; a cycle anywhere rejects the
    /// whole batch.
    pub fn add_threads(&mut self, drafts: Vec<ThreadDraft>) -> Result<Vec<ThreadId>> {
        let threads = self.ledger.prepare(drafts)?;
        self.persist(&threads)?;

        let ids: Vec<ThreadId> = threads.iter().map(Thread::id).collect();
        self.ledger.insert_prepared(threads);
        tracing::info!(count = ids.len(), "Threads added");
        Ok(ids)
    }

    /// Build the ranked shortlist for `step`.
    ///
    /// Promotes ready pending threads and synthesizes one thread if nothing
    /// is eligible; both changes are persisted.
    pub fn shortlist(&mut self, step: u64, k: usize) -> Result<Shortlist> {
        if self.store.is_none() {
            return self.selector.shortlist(&mut self.ledger, step, k);
        }

        let mut staged = self.ledger.clone();
        let shortlist = self.selector.shortlist(&mut staged, step, k)?;
        let touched = shortlist
            .touched()
            .into_iter()
            .map(|id| staged.get(id).cloned())
            .collect::<Result<Vec<_>>>()?;
        self.persist(&touched)?;
        self.ledger = staged;
        Ok(shortlist)
    }

    /// Pick the thread for `step`, consulting `oracle` if given.
    pub async fn choose(&mut self, step: u64, k: usize, oracle: Option<&dyn Oracle>) -> Result<Choice> {
        let shortlist = self.shortlist(step, k)?;
        self.selector.resolve(shortlist, oracle).await
    }

    /// Ranked eligible threads at `step`, without promoting or synthesizing.
    pub fn eligible(&self, step: u64) -> Vec<Candidate> {
        self.selector.rank(&self.ledger, step)
    }

    /// Apply a step outcome to a thread and return its new status.
    pub fn apply(
        &mut self,
        id: ThreadId,
        direction: Direction,
        amount: u8,
        step: u64,
        note: impl Into<String>,
    ) -> Result<ThreadStatus> {
        let updated = self.tracker.preview(&self.ledger, id, direction, amount, step, note)?;
        self.persist(std::slice::from_ref(&updated))?;

        let status = updated.status();
        self.ledger.commit(updated)?;
        Ok(status)
    }

    pub fn apply_outcome(&mut self, id: ThreadId, outcome: &Outcome, step: u64) -> Result<ThreadStatus> {
        self.apply(id, outcome.direction, outcome.amount, step, outcome.note.clone())
    }

    /// Take a thread out of selection until resumed.
    pub fn pause(&mut self, id: ThreadId) -> Result<()> {
        let thread = self.ledger.get(id)?;
        match thread.status() {
            ThreadStatus::Completed => return Err(SchedulerError::AlreadyCompleted(id)),
            ThreadStatus::Paused => {
                return Err(SchedulerError::InvalidState(format!("thread {id} is already paused")));
            }
            _ => {}
        }

        let mut updated = thread.clone();
        updated.status = ThreadStatus::Paused;
        updated.touch();
        self.persist(std::slice::from_ref(&updated))?;
        self.ledger.commit(updated)?;

        tracing::info!(id = %id, "Thread paused");
        Ok(())
    }

    /// Return a paused thread to selection.
    ///
    /// It comes back active if its dependencies are complete, pending
    /// otherwise.
    pub fn resume(&mut self, id: ThreadId) -> Result<ThreadStatus> {
        let thread = self.ledger.get(id)?;
        if thread.status() != ThreadStatus::Paused {
            return Err(SchedulerError::InvalidState(format!(
                "thread {id} is {}, not paused",
                thread.status()
            )));
        }

        let status = if gate::dependencies_met(thread, &self.ledger) {
            ThreadStatus::Active
        } else {
            ThreadStatus::Pending
        };

        let mut updated = thread.clone();
        updated.status = status;
        updated.touch();
        self.persist(std::slice::from_ref(&updated))?;
        self.ledger.commit(updated)?;

        tracing::info!(id = %id, status = %status, "Thread resumed");
        Ok(status)
    }

    /// Every non-completed thread, ascending id.
    pub fn active_summary(&self) -> Vec<ActiveSummary> {
        self.ledger.all_active().into_iter().map(ActiveSummary::from).collect()
    }

    /// Every completed thread with its payoff, ascending id.
    pub fn completed_summary(&self) -> Vec<CompletedSummary> {
        self.ledger.all_completed().into_iter().map(CompletedSummary::from).collect()
    }

    /// The last `n` history entries across all threads, oldest first.
    ///
    /// Entries are ordered by step, then thread id.
    pub fn recent_history(&self, n: usize) -> Vec<HistoryLine> {
        let mut lines: Vec<HistoryLine> = self
            .ledger
            .iter()
            .flat_map(|thread| {
                thread.history().iter().map(move |entry| HistoryLine {
                    step: entry.step,
                    id: thread.id(),
                    description: thread.description().to_string(),
                    note: entry.note.clone(),
                })
            })
            .collect();

        lines.sort_by_key(|line| (line.step, line.id));
        let skip = lines.len().saturating_sub(n);
        lines.split_off(skip)
    }

    pub fn thread(&self, id: ThreadId) -> Result<&Thread> {
        self.ledger.get(id)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Configured default shortlist size.
    pub fn shortlist_size(&self) -> usize {
        self.shortlist_size
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    fn persist(&self, threads: &[Thread]) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if threads.is_empty() {
            return Ok(());
        }
        store
            .save_all(threads)
            .inspect_err(|e| tracing::warn!(count = threads.len(), error = %e, "Failed to persist threads"))
    }
}

/// Scheduler shared between tasks.
///
/// Reads run concurrently. `choose` holds the write lock only while the
/// shortlist is built; the oracle is consulted after the lock is released.
#[derive(Debug, Clone)]
pub struct SharedScheduler {
    inner: Arc<RwLock<ThreadScheduler>>,
}

impl SharedScheduler {
    pub fn new(scheduler: ThreadScheduler) -> Self {
        Self {
            inner: Arc::new(RwLock::new(scheduler)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, ThreadScheduler> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, ThreadScheduler> {
        self.inner.write().await
    }

    pub async fn add_thread(&self, new: NewThread) -> Result<ThreadId> {
        self.inner.write().await.add_thread(new)
    }

    pub async fn add_threads(&self, drafts: Vec<ThreadDraft>) -> Result<Vec<ThreadId>> {
        self.inner.write().await.add_threads(drafts)
    }

    pub async fn choose(&self, step: u64, k: usize, oracle: Option<&dyn Oracle>) -> Result<Choice> {
        let (shortlist, selector) = {
            let mut scheduler = self.inner.write().await;
            let shortlist = scheduler.shortlist(step, k)?;
            (shortlist, scheduler.selector.clone())
        };
        selector.resolve(shortlist, oracle).await
    }

    pub async fn apply_outcome(&self, id: ThreadId, outcome: &Outcome, step: u64) -> Result<ThreadStatus> {
        self.inner.write().await.apply_outcome(id, outcome, step)
    }

    pub async fn pause(&self, id: ThreadId) -> Result<()> {
        self.inner.write().await.pause(id)
    }

    pub async fn resume(&self, id: ThreadId) -> Result<ThreadStatus> {
        self.inner.write().await.resume(id)
    }

    pub async fn active_summary(&self) -> Vec<ActiveSummary> {
        self.inner.read().await.active_summary()
    }

    pub async fn completed_summary(&self) -> Vec<CompletedSummary> {
        self.inner.read().await.completed_summary()
    }

    pub async fn recent_history(&self, n: usize) -> Vec<HistoryLine> {
        self.inner.read().await.recent_history(n)
    }
}
