//! End-to-end scheduling scenarios against the public API.

use std::sync::Arc;

use tempfile::TempDir;
use threadloom::config::{SchedulerConfig, StorageBackend, StorageConfig};
use threadloom::domain::{Direction, Outcome, ThreadStatus};
use threadloom::ledger::{NewThread, ThreadDraft};
use threadloom::runner::{ScriptedCollaborator, StepRunner};
use threadloom::scheduler::{Candidate, ChoiceSource, FnOracle, OracleError, ThreadScheduler};
use threadloom::{SchedulerError, ThreadId};

fn scheduler() -> ThreadScheduler {
    ThreadScheduler::new(&SchedulerConfig::default())
}

/// Drive a thread to completion with maximal progress steps.
fn complete(scheduler: &mut ThreadScheduler, id: ThreadId, mut step: u64) -> u64 {
    while scheduler.thread(id).unwrap().status() != ThreadStatus::Completed {
        scheduler.apply(id, Direction::Progress, 100, step, "push").unwrap();
        step += 1;
    }
    step
}

#[tokio::test]
async fn test_high_importance_thread_chosen_first() {
    let mut s = scheduler();
    let x = s.add_thread(NewThread::new("X", 9)).unwrap();
    let _y = s.add_thread(NewThread::new("Y", 3)).unwrap();

    let choice = s.choose(0, 1, None).await.unwrap();
    assert_eq!(choice.id, x);
    assert_eq!(choice.shortlist.len(), 1);
    assert_eq!(choice.shortlist[0].score, 170.0);
}

#[tokio::test]
async fn test_dependent_thread_waits_for_completion() {
    let mut s = scheduler();
    let w = s.add_thread(NewThread::new("W", 2)).unwrap();
    let z = s.add_thread(NewThread::new("Z", 10).depends_on([w])).unwrap();

    // Progress is clamped to 30 per step, so W needs several applies to complete
    let mut step = 1;
    while s.thread(w).unwrap().status() != ThreadStatus::Completed {
        let choice = s.choose(step, 5, None).await.unwrap();
        assert_ne!(choice.id, z);
        assert!(choice.shortlist.iter().all(|c| c.id != z));
        s.apply(w, Direction::Progress, 100, step, "W moves").unwrap();
        step += 1;
    }

    let choice = s.choose(step, 5, None).await.unwrap();
    assert_eq!(choice.id, z);
    assert_eq!(s.thread(z).unwrap().status(), ThreadStatus::Active);
}

#[test]
fn test_dependent_thread_cannot_be_applied_early() {
    let mut s = scheduler();
    let w = s.add_thread(NewThread::new("W", 2)).unwrap();
    let z = s.add_thread(NewThread::new("Z", 10).depends_on([w])).unwrap();

    for step in 1..=4 {
        let err = s.apply(z, Direction::Progress, 30, step, "jump ahead").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState(_)));
    }
    assert_eq!(s.thread(z).unwrap().status(), ThreadStatus::Pending);
    assert_eq!(s.thread(z).unwrap().progress(), 0);
    assert_eq!(s.thread(w).unwrap().status(), ThreadStatus::Active);

    let step = complete(&mut s, w, 1);
    assert_eq!(s.apply(z, Direction::Progress, 30, step, "now").unwrap(), ThreadStatus::Active);
}

#[test]
fn test_inverted_progress_limits_clamp_without_panicking() {
    let mut config = SchedulerConfig::default();
    config.progress.advance_min = 40;
    config.progress.advance_max = 10;
    let mut s = ThreadScheduler::new(&config);
    let a = s.add_thread(NewThread::new("A", 5)).unwrap();

    assert_eq!(s.apply(a, Direction::Progress, 20, 1, "odd").unwrap(), ThreadStatus::Active);
    assert_eq!(s.thread(a).unwrap().progress(), 20);
}

#[test]
fn test_stale_thread_outscores_recent_twin() {
    let mut s = scheduler();
    let old = s.add_thread(NewThread::new("Old", 5)).unwrap();
    let recent = s.add_thread(NewThread::new("Recent", 5)).unwrap();

    for (step, amount) in [(3, 30), (4, 30), (5, 10)] {
        s.apply(old, Direction::Progress, amount, step, "advance").unwrap();
    }
    for step in 6..=10 {
        s.apply(old, Direction::Static, 0, step, "quiet").unwrap();
    }
    for (step, amount) in [(8, 30), (9, 30), (10, 10)] {
        s.apply(recent, Direction::Progress, amount, step, "advance").unwrap();
    }
    assert_eq!(s.thread(old).unwrap().progress(), 70);
    assert_eq!(s.thread(recent).unwrap().progress(), 70);
    assert_eq!(s.thread(old).unwrap().last_advanced_step(), Some(5));

    let ranked = s.eligible(11);
    let score_of = |id: ThreadId| ranked.iter().find(|c| c.id == id).unwrap().score;
    assert!(score_of(old) > score_of(recent));
    assert_eq!(score_of(old) - score_of(recent), 25.0);
    assert_eq!(ranked[0].id, old);
}

#[test]
fn test_cyclic_batch_inserts_nothing() {
    let mut s = scheduler();
    let err = s
        .add_threads(vec![
            ThreadDraft::new("a", "A", 5).depends_on("b"),
            ThreadDraft::new("b", "B", 5).depends_on("a"),
        ])
        .unwrap_err();

    assert!(matches!(err, SchedulerError::Cycle { .. }));
    assert!(s.ledger().is_empty());
    assert!(s.active_summary().is_empty());
}

#[tokio::test]
async fn test_each_empty_choose_synthesizes_exactly_one() {
    let mut s = scheduler();

    for round in 1..=3u64 {
        let before = s.ledger().len();
        let choice = s.choose(round, 3, None).await.unwrap();

        assert_eq!(s.ledger().len(), before + 1);
        let synthesized = choice.synthesized.unwrap();
        assert_eq!(choice.id, synthesized);
        assert!(s.thread(synthesized).unwrap().is_synthesized());

        // Take it out of play so the next call finds nothing eligible again
        s.pause(synthesized).unwrap();
    }
}

#[tokio::test]
async fn test_choose_with_eligible_threads_does_not_synthesize() {
    let mut s = scheduler();
    s.add_thread(NewThread::new("Real arc", 4)).unwrap();

    for step in 0..3 {
        let choice = s.choose(step, 3, None).await.unwrap();
        assert!(choice.synthesized.is_none());
    }
    assert_eq!(s.ledger().len(), 1);
}

#[tokio::test]
async fn test_oracle_outside_shortlist_uses_top_candidate() {
    let mut s = scheduler();
    let x = s.add_thread(NewThread::new("X", 9)).unwrap();
    let y = s.add_thread(NewThread::new("Y", 3)).unwrap();

    let rogue = FnOracle::new(move |_: &[Candidate]| Ok(y));
    let choice = s.choose(0, 1, Some(&rogue)).await.unwrap();
    assert_eq!(choice.id, x);
    assert!(matches!(choice.source, ChoiceSource::Fallback { .. }));

    let down = FnOracle::new(|_: &[Candidate]| Err(OracleError::Unavailable("no route".to_string())));
    let choice = s.choose(1, 3, Some(&down)).await.unwrap();
    assert_eq!(choice.id, x);
}

#[test]
fn test_apply_to_completed_thread_changes_nothing() {
    let mut s = scheduler();
    let id = s.add_thread(NewThread::new("Done soon", 5)).unwrap();
    let step = complete(&mut s, id, 1);

    let before = s.thread(id).unwrap().clone();
    let err = s.apply(id, Direction::Backslide, 10, step, "too late").unwrap_err();
    assert!(matches!(err, SchedulerError::AlreadyCompleted(_)));
    assert_eq!(s.thread(id).unwrap(), &before);

    let completed = s.completed_summary();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, id);
}

#[test]
fn test_unknown_ids_are_rejected() {
    let mut s = scheduler();
    let ghost: ThreadId = "99".parse().unwrap();

    assert!(matches!(
        s.add_thread(NewThread::new("Orphan", 5).depends_on([ghost])),
        Err(SchedulerError::UnknownDependency { .. })
    ));
    assert!(matches!(
        s.apply(ghost, Direction::Progress, 10, 1, "x"),
        Err(SchedulerError::ThreadNotFound(_))
    ));
    assert!(matches!(s.pause(ghost), Err(SchedulerError::ThreadNotFound(_))));
}

#[test]
fn test_invalid_importance_rejected() {
    let mut s = scheduler();
    assert!(matches!(
        s.add_thread(NewThread::new("Zero", 0)),
        Err(SchedulerError::InvalidImportance(0))
    ));
    assert!(matches!(
        s.add_thread(NewThread::new("Eleven", 11)),
        Err(SchedulerError::InvalidImportance(11))
    ));
}

#[test]
fn test_recent_history_spans_threads() {
    let mut s = scheduler();
    let a = s.add_thread(NewThread::new("A", 5)).unwrap();
    let b = s.add_thread(NewThread::new("B", 5)).unwrap();

    s.apply(a, Direction::Progress, 10, 1, "a moves").unwrap();
    s.apply(b, Direction::Backslide, 10, 2, "b slips").unwrap();
    s.apply(a, Direction::Static, 0, 3, "a rests").unwrap();

    let history = s.recent_history(2);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, b);
    assert_eq!(history[0].note, "b slips");
    assert_eq!(history[1].step, 3);
}

#[tokio::test]
async fn test_runner_story_with_persistence() {
    let temp = TempDir::new().unwrap();
    let config = SchedulerConfig {
        storage: StorageConfig {
            backend: StorageBackend::Sqlite,
            dir: temp.path().to_path_buf(),
            per_project: false,
        },
        ..SchedulerConfig::default()
    };

    let (setup, payoff) = {
        let mut s = ThreadScheduler::open(&config, temp.path()).unwrap();
        let ids = s
            .add_threads(vec![
                ThreadDraft::new("setup", "Plant the locket", 6),
                ThreadDraft::new("payoff", "Reveal the locket's owner", 9)
                    .depends_on("setup")
                    .with_payoff("The heir is revealed"),
            ])
            .unwrap();

        let runner = StepRunner::new(Arc::new(ScriptedCollaborator::from_outcomes(
            std::iter::repeat_n(Outcome::progress(30, "progress"), 4),
        )));
        runner.run_steps(&mut s, 1, 4).await.unwrap();
        (ids[0], ids[1])
    };

    let s = ThreadScheduler::open(&config, temp.path()).unwrap();
    assert_eq!(s.thread(setup).unwrap().status(), ThreadStatus::Completed);
    assert_eq!(s.thread(payoff).unwrap().payoff_summary(), "The heir is revealed");
    assert_eq!(s.completed_summary()[0].id, setup);
    assert_eq!(s.recent_history(10).len(), 4);
}
