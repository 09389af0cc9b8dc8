//! Dependency gating: which threads may be selected right now.
//!
//! A thread is eligible when its status permits selection (pending, active or
//! backsliding; never completed or paused) and every dependency is completed.
//! Checking a pending thread whose dependencies have all completed promotes it
//! to active. Applying an outcome to such a thread does the same; a pending
//! thread with unfinished dependencies never leaves pending.

use crate::domain::{Thread, ThreadStatus};
use crate::error::Result;
use crate::id::ThreadId;
use crate::ledger::Ledger;

/// Dependencies of `thread` that are not yet completed.
///
/// Unknown ids count as unmet.
pub fn unmet_dependencies(thread: &Thread, ledger: &Ledger) -> Vec<ThreadId> {
    thread
        .dependencies()
        .iter()
        .copied()
        .filter(|dep| ledger.status_of(*dep) != Some(ThreadStatus::Completed))
        .collect()
}

/// Whether every dependency of `thread` is completed.
pub fn dependencies_met(thread: &Thread, ledger: &Ledger) -> bool {
    thread
        .dependencies()
        .iter()
        .all(|dep| ledger.status_of(*dep) == Some(ThreadStatus::Completed))
}

/// Pure eligibility check, no promotion.
pub fn is_eligible(thread: &Thread, ledger: &Ledger) -> bool {
    thread.status().is_selectable() && dependencies_met(thread, ledger)
}

/// Eligibility check for one thread, promoting it if it was pending and ready.
pub fn check(ledger: &mut Ledger, id: ThreadId) -> Result<bool> {
    let thread = ledger.get(id)?;
    if !is_eligible(thread, ledger) {
        return Ok(false);
    }
    if thread.status() == ThreadStatus::Pending {
        ledger.set_status(id, ThreadStatus::Active)?;
        tracing::debug!(id = %id, "Pending thread promoted to active");
    }
    Ok(true)
}

/// Ids of pending threads whose dependencies have all completed.
pub(crate) fn ready_to_promote(ledger: &Ledger) -> Vec<ThreadId> {
    ledger
        .all_active()
        .into_iter()
        .filter(|t| t.status() == ThreadStatus::Pending && dependencies_met(t, ledger))
        .map(Thread::id)
        .collect()
}

/// Result of running the gate over the working set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Eligible ids, ascending
    pub eligible: Vec<ThreadId>,
    /// Ids moved from pending to active by this evaluation
    pub promoted: Vec<ThreadId>,
}

/// Run the gate over the whole working set.
///
/// Promotes every ready pending thread and returns the eligible ids in
/// ascending order.
pub fn evaluate(ledger: &mut Ledger) -> Result<Evaluation> {
    let promoted = ready_to_promote(ledger);
    let ids: Vec<ThreadId> = ledger.all_active().into_iter().map(Thread::id).collect();
    let mut eligible = Vec::new();
    for id in ids {
        if check(ledger, id)? {
            eligible.push(id);
        }
    }
    Ok(Evaluation { eligible, promoted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NewThread;

    fn complete(ledger: &mut Ledger, id: ThreadId) {
        let mut thread = ledger.get(id).unwrap().clone();
        thread.progress = 100;
        thread.status = ThreadStatus::Completed;
        ledger.commit(thread).unwrap();
    }

    #[test]
    fn test_independent_thread_is_eligible() {
        let mut ledger = Ledger::new();
        let id = ledger.add(NewThread::new("A", 5)).unwrap();
        assert!(is_eligible(ledger.get(id).unwrap(), &ledger));
    }

    #[test]
    fn test_open_dependency_blocks() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        let b = ledger.add(NewThread::new("B", 5).depends_on([a])).unwrap();

        assert!(!is_eligible(ledger.get(b).unwrap(), &ledger));
        assert_eq!(unmet_dependencies(ledger.get(b).unwrap(), &ledger), vec![a]);
        assert!(!check(&mut ledger, b).unwrap());
        assert_eq!(ledger.status_of(b), Some(ThreadStatus::Pending));
    }

    #[test]
    fn test_check_promotes_ready_pending_thread() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        let b = ledger.add(NewThread::new("B", 5).depends_on([a])).unwrap();
        complete(&mut ledger, a);

        assert!(check(&mut ledger, b).unwrap());
        assert_eq!(ledger.status_of(b), Some(ThreadStatus::Active));
    }

    #[test]
    fn test_paused_thread_not_eligible() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        ledger.set_status(a, ThreadStatus::Paused).unwrap();
        assert!(!check(&mut ledger, a).unwrap());
    }

    #[test]
    fn test_backsliding_thread_is_eligible() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        ledger.set_status(a, ThreadStatus::Backsliding).unwrap();
        assert!(check(&mut ledger, a).unwrap());
        assert_eq!(ledger.status_of(a), Some(ThreadStatus::Backsliding));
    }

    #[test]
    fn test_active_status_with_open_dependency_still_blocked() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        let b = ledger.add(NewThread::new("B", 5).depends_on([a])).unwrap();
        ledger.set_status(b, ThreadStatus::Active).unwrap();
        assert!(!is_eligible(ledger.get(b).unwrap(), &ledger));
    }

    #[test]
    fn test_evaluate_promotes_and_lists() {
        let mut ledger = Ledger::new();
        let a = ledger.add(NewThread::new("A", 5)).unwrap();
        let b = ledger.add(NewThread::new("B", 5).depends_on([a])).unwrap();
        let c = ledger.add(NewThread::new("C", 5).depends_on([b])).unwrap();

        let first = evaluate(&mut ledger).unwrap();
        assert_eq!(first.eligible, vec![a]);
        assert!(first.promoted.is_empty());

        complete(&mut ledger, a);
        assert_eq!(ready_to_promote(&ledger), vec![b]);
        let second = evaluate(&mut ledger).unwrap();
        assert_eq!(second.eligible, vec![b]);
        assert_eq!(second.promoted, vec![b]);
        assert_eq!(ledger.status_of(b), Some(ThreadStatus::Active));
        assert_eq!(ledger.status_of(c), Some(ThreadStatus::Pending));
    }

    #[test]
    fn test_check_unknown_id() {
        let mut ledger = Ledger::new();
        assert!(check(&mut ledger, ThreadId::new(3)).is_err());
    }
}
