use bbopt::prelude::*;
use serde_json::json;

use crate::in_memory;

#[test]
fn objective_can_only_be_set_once() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.minimize(1.0).unwrap();
    assert!(matches!(bb.minimize(0.5), Err(Error::ObjectiveAlreadySet)));
    assert!(matches!(bb.maximize(2.0), Err(Error::ObjectiveAlreadySet)));
    assert_eq!(history.len(), 1);
}

#[test]
fn remember_merges_and_overwrites() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.remember([("epochs", json!(10)), ("optimizer", json!("adam"))])
        .unwrap();
    bb.run("guess").unwrap();
    bb.remember([("epochs", json!(12)), ("val_acc", json!(0.91))])
        .unwrap();
    bb.maximize(0.91).unwrap();

    let stored = &history.load().unwrap()[0];
    assert_eq!(stored.memory["epochs"], json!(12));
    assert_eq!(stored.memory["optimizer"], json!("adam"));
    assert_eq!(stored.memory["val_acc"], json!(0.91));
}

#[test]
fn tuple_objectives_with_weights() {
    let history = MemoryHistory::new();
    for (loss, latency) in [(0.2, 50.0), (0.25, 10.0)] {
        let mut bb = in_memory(&history);
        bb.minimize_with(
            [loss, latency],
            Comparison::Weighted(vec![100.0, 1.0]),
        )
        .unwrap();
    }
    // 0.2 * 100 + 50 = 70 versus 0.25 * 100 + 10 = 35.
    let best = in_memory(&history).get_optimal_run().unwrap();
    assert_eq!(best.sequence_index, Some(1));
    assert_eq!(best.comparison, Comparison::Weighted(vec![100.0, 1.0]));
}

#[test]
fn tuple_objectives_lexicographic_by_default() {
    let history = MemoryHistory::new();
    for objective in [[1.0, 5.0], [1.0, 3.0], [2.0, 0.0]] {
        in_memory(&history).minimize(objective).unwrap();
    }
    let best = in_memory(&history).get_optimal_run().unwrap();
    assert_eq!(best.objective, Some(Objective::Vector(vec![1.0, 3.0])));
}

#[test]
fn empty_tuple_is_rejected() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    assert!(matches!(
        bb.minimize(Vec::<f64>::new()),
        Err(Error::InvalidObjective(_))
    ));
    assert!(history.is_empty());
}

/// A store whose appends fail a fixed number of times.
struct Flaky {
    inner: MemoryHistory,
    failures: std::sync::atomic::AtomicUsize,
}

impl HistoryStore for Flaky {
    fn load(&self) -> bbopt::Result<Vec<RunRecord>> {
        self.inner.load()
    }

    fn append(&self, record: RunRecord) -> bbopt::Result<RunRecord> {
        use std::sync::atomic::Ordering;
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Durability("disk full".into()));
        }
        self.inner.append(record)
    }
}

#[test]
fn failed_append_can_be_retried() {
    let history = MemoryHistory::new();
    let store = Flaky {
        inner: history.clone(),
        failures: std::sync::atomic::AtomicUsize::new(1),
    };
    let mut bb = Session::builder("flaky.rs").store(store).build().unwrap();
    bb.randint("x", 0, 9, 4).unwrap();
    bb.run("guess").unwrap();

    assert!(matches!(bb.minimize(1.0), Err(Error::Durability(_))));
    assert_eq!(bb.state(), SessionState::Active);
    assert!(bb.get_current_run().objective.is_none());
    assert!(history.is_empty());

    bb.minimize(1.0).unwrap();
    assert_eq!(bb.state(), SessionState::Finalized);
    assert_eq!(history.len(), 1);
}
