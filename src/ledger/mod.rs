//! The ledger: single source of truth for every thread and its history.
//!
//! The ledger is a pure store plus invariant guard. It assigns identities,
//! rejects unknown or cyclic dependencies at insertion time, and keeps
//! completed threads in a read-only set. It holds no scoring or selection
//! logic.
//!
//! # Example
//!
//! ```ignore
//! use threadloom::ledger::{Ledger, NewThread};
//!
//! let mut ledger = Ledger::new();
//! let heist = ledger.add(NewThread::new("Plan the heist", 8))?;
//! let escape = ledger.add(NewThread::new("Escape the city", 6).depends_on([heist]))?;
//! ```

mod draft;
mod graph;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::{HistoryEntry, Thread, ThreadStatus};
use crate::error::{Result, SchedulerError};
use crate::id::ThreadId;

pub use draft::{DependencyRef, NewThread, ThreadDraft};

/// First id handed out by an empty ledger.
const FIRST_ID: u64 = 1;

/// In-memory thread store.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Working set: everything not yet completed (paused threads included)
    active: BTreeMap<ThreadId, Thread>,
    /// Completed threads, read-only
    completed: BTreeMap<ThreadId, Thread>,
    /// Next id to assign; only ever grows
    next_id: ThreadId,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            completed: BTreeMap::new(),
            next_id: ThreadId::new(FIRST_ID),
        }
    }

    /// Rebuild a ledger from persisted records.
    ///
    /// Every record must satisfy its invariants and every dependency must
    /// resolve within the restored set. The id counter resumes after the
    /// highest id seen.
    pub fn restore(threads: impl IntoIterator<Item = Thread>) -> Result<Self> {
        let mut ledger = Self::new();
        for thread in threads {
            thread.check_invariants().map_err(SchedulerError::Storage)?;
            if ledger.contains(thread.id) {
                return Err(SchedulerError::Storage(format!("duplicate thread id {}", thread.id)));
            }
            if thread.id >= ledger.next_id {
                ledger.next_id = thread.id.next();
            }
            if thread.status == ThreadStatus::Completed {
                ledger.completed.insert(thread.id, thread);
            } else {
                ledger.active.insert(thread.id, thread);
            }
        }

        for thread in ledger.active.values().chain(ledger.completed.values()) {
            if let Some(missing) = thread.dependencies.iter().find(|dep| !ledger.contains(**dep)) {
                return Err(SchedulerError::UnknownDependency {
                    dependency: missing.to_string(),
                });
            }
        }
        let roots: Vec<ThreadId> = ledger.active.keys().copied().collect();
        if let Some(cycle) = graph::find_cycle(&roots, |id| ledger.direct_dependencies(id)) {
            return Err(SchedulerError::Cycle {
                path: cycle.iter().map(ToString::to_string).collect(),
            });
        }

        tracing::debug!(
            active = ledger.active.len(),
            completed = ledger.completed.len(),
            next_id = %ledger.next_id,
            "Ledger restored"
        );
        Ok(ledger)
    }

    /// Add a single thread. Returns its new id.
    pub fn add(&mut self, new: NewThread) -> Result<ThreadId> {
        let ids = self.add_batch(vec![new.into()])?;
        Ok(ids[0])
    }

    /// Add a batch of drafts atomically. Ids are returned in draft order.
    pub fn add_batch(&mut self, drafts: Vec<ThreadDraft>) -> Result<Vec<ThreadId>> {
        let prepared = self.prepare(drafts)?;
        let ids = prepared.iter().map(Thread::id).collect();
        self.insert_prepared(prepared);
        Ok(ids)
    }

    /// Validate drafts and build their records without inserting them.
    ///
    /// Fails on duplicate keys, out-of-range importance, self-dependency,
    /// unknown dependencies, or any cycle reachable from the new threads.
    pub(crate) fn prepare(&self, drafts: Vec<ThreadDraft>) -> Result<Vec<Thread>> {
        let mut keys: HashMap<String, ThreadId> = HashMap::new();
        let mut next = self.next_id;
        for draft in &drafts {
            if keys.insert(draft.key.clone(), next).is_some() {
                return Err(SchedulerError::InvalidState(format!(
                    "duplicate draft key in batch: {}",
                    draft.key
                )));
            }
            next = next.next();
        }

        let mut resolved: BTreeMap<ThreadId, BTreeSet<ThreadId>> = BTreeMap::new();
        for draft in &drafts {
            if !(1..=10).contains(&draft.importance) {
                return Err(SchedulerError::InvalidImportance(draft.importance));
            }
            let mut deps = BTreeSet::new();
            for dependency in &draft.dependencies {
                let id = match dependency {
                    DependencyRef::Existing(id) if self.contains(*id) => *id,
                    DependencyRef::Existing(id) => {
                        return Err(SchedulerError::UnknownDependency {
                            dependency: id.to_string(),
                        });
                    }
                    DependencyRef::Draft(key) if *key == draft.key => {
                        return Err(SchedulerError::SelfDependency(key.clone()));
                    }
                    DependencyRef::Draft(key) => {
                        *keys.get(key).ok_or_else(|| SchedulerError::UnknownDependency {
                            dependency: key.clone(),
                        })?
                    }
                };
                deps.insert(id);
            }
            resolved.insert(keys[&draft.key], deps);
        }

        let roots: Vec<ThreadId> = resolved.keys().copied().collect();
        let deps_of = |id: ThreadId| match resolved.get(&id) {
            Some(deps) => deps.iter().copied().collect(),
            None => self.direct_dependencies(id),
        };
        if let Some(cycle) = graph::find_cycle(&roots, deps_of) {
            let labels: HashMap<ThreadId, &str> = keys.iter().map(|(k, id)| (*id, k.as_str())).collect();
            let path = cycle
                .iter()
                .map(|id| labels.get(id).map(|k| k.to_string()).unwrap_or_else(|| id.to_string()))
                .collect();
            return Err(SchedulerError::Cycle { path });
        }

        let threads = drafts
            .into_iter()
            .map(|draft| {
                let id = keys[&draft.key];
                let deps = resolved.remove(&id).unwrap_or_default();
                let ready = deps
                    .iter()
                    .all(|dep| self.status_of(*dep) == Some(ThreadStatus::Completed));
                let status = if ready { ThreadStatus::Active } else { ThreadStatus::Pending };
                Thread::new(
                    id,
                    draft.description,
                    draft.importance,
                    deps,
                    draft.payoff_summary.unwrap_or_default(),
                    status,
                )
            })
            .collect();
        Ok(threads)
    }

    /// Insert records produced by `prepare`.
    pub(crate) fn insert_prepared(&mut self, threads: Vec<Thread>) {
        for thread in threads {
            if thread.id >= self.next_id {
                self.next_id = thread.id.next();
            }
            tracing::debug!(
                id = %thread.id,
                importance = thread.importance,
                status = %thread.status,
                dependencies = thread.dependencies.len(),
                "Thread added"
            );
            self.active.insert(thread.id, thread);
        }
    }

    /// Get a thread by id from either set.
    pub fn get(&self, id: ThreadId) -> Result<&Thread> {
        self.find(id).ok_or(SchedulerError::ThreadNotFound(id))
    }

    /// Look up a thread by id, `None` if unknown.
    pub fn find(&self, id: ThreadId) -> Option<&Thread> {
        self.active.get(&id).or_else(|| self.completed.get(&id))
    }

    /// Whether the ledger has ever stored this id.
    pub fn contains(&self, id: ThreadId) -> bool {
        self.active.contains_key(&id) || self.completed.contains_key(&id)
    }

    /// Status of a thread, `None` if unknown.
    pub fn status_of(&self, id: ThreadId) -> Option<ThreadStatus> {
        self.find(id).map(Thread::status)
    }

    /// All threads in the working set, ascending by id.
    pub fn all_active(&self) -> Vec<&Thread> {
        self.active.values().collect()
    }

    /// All completed threads, ascending by id.
    pub fn all_completed(&self) -> Vec<&Thread> {
        self.completed.values().collect()
    }

    /// Every thread, active then completed.
    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.active.values().chain(self.completed.values())
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id the next inserted thread will receive.
    pub fn next_id(&self) -> ThreadId {
        self.next_id
    }

    /// Append a history record without changing progress.
    ///
    /// The entry's resulting progress is the thread's current progress.
    pub fn append_history(&mut self, id: ThreadId, step: u64, delta: i16, note: impl Into<String>) -> Result<()> {
        if self.completed.contains_key(&id) {
            return Err(SchedulerError::AlreadyCompleted(id));
        }
        let thread = self.active.get_mut(&id).ok_or(SchedulerError::ThreadNotFound(id))?;
        check_step(thread, step)?;
        thread.history.push(HistoryEntry::new(step, delta, thread.progress, note));
        thread.touch();
        Ok(())
    }

    /// Replace an active thread with an updated copy.
    ///
    /// A copy whose status is `Completed` moves to the completed set.
    pub(crate) fn commit(&mut self, thread: Thread) -> Result<()> {
        if !self.active.contains_key(&thread.id) {
            return Err(self.missing_from_active(thread.id));
        }
        if thread.status == ThreadStatus::Completed {
            self.active.remove(&thread.id);
            tracing::info!(id = %thread.id, "Thread completed");
            self.completed.insert(thread.id, thread);
        } else {
            self.active.insert(thread.id, thread);
        }
        Ok(())
    }

    /// Set the status of an active thread.
    pub(crate) fn set_status(&mut self, id: ThreadId, status: ThreadStatus) -> Result<()> {
        if !self.active.contains_key(&id) {
            return Err(self.missing_from_active(id));
        }
        let thread = self.active.get_mut(&id).ok_or(SchedulerError::ThreadNotFound(id))?;
        thread.status = status;
        thread.touch();
        Ok(())
    }

    /// Error for an id that is not in the working set.
    fn missing_from_active(&self, id: ThreadId) -> SchedulerError {
        if self.completed.contains_key(&id) {
            SchedulerError::AlreadyCompleted(id)
        } else {
            SchedulerError::ThreadNotFound(id)
        }
    }

    fn direct_dependencies(&self, id: ThreadId) -> Vec<ThreadId> {
        self.find(id)
            .map(|t| t.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Reject a step that is not strictly after the thread's last history entry.
pub(crate) fn check_step(thread: &Thread, step: u64) -> Result<()> {
    match thread.last_recorded_step() {
        Some(last) if step <= last => Err(SchedulerError::StepOutOfOrder {
            id: thread.id,
            step,
            last,
        }),
        _ => Ok(()),
    }
}
