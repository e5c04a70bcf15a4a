use bbopt::prelude::*;

use crate::in_memory;

#[test]
fn best_of_three_minimized_runs() {
    let history = MemoryHistory::new();
    for objective in [3.0, 1.0, 2.0] {
        let mut bb = in_memory(&history);
        bb.minimize(objective).unwrap();
    }

    let best = in_memory(&history).get_optimal_run().unwrap();
    assert_eq!(best.sequence_index, Some(1));
    assert_eq!(best.objective, Some(Objective::Scalar(1.0)));
}

#[test]
fn empty_history_has_no_optimum() {
    let history = MemoryHistory::new();
    assert!(matches!(
        in_memory(&history).get_optimal_run(),
        Err(Error::EmptyHistory)
    ));
}

#[test]
fn equal_objectives_prefer_the_earliest_run() {
    let history = MemoryHistory::new();
    for (i, objective) in [4.0, 2.0, 2.0, 2.0].into_iter().enumerate() {
        let mut bb = in_memory(&history);
        bb.remember([("trial", i)]).unwrap();
        bb.maximize(-objective).unwrap();
    }
    let best = in_memory(&history).get_optimal_run().unwrap();
    assert_eq!(best.sequence_index, Some(1));
}

#[test]
fn top_runs_are_sorted_best_first() {
    let history = MemoryHistory::new();
    for objective in [0.3, 0.9, 0.1, 0.5] {
        in_memory(&history).maximize(objective).unwrap();
    }
    let top = in_memory(&history).top_runs(3).unwrap();
    let objectives: Vec<_> = top
        .iter()
        .map(|r| r.objective.as_ref().and_then(Objective::as_scalar).unwrap())
        .collect();
    assert_eq!(objectives, vec![0.9, 0.5, 0.3]);
}

#[test]
fn optimal_run_includes_other_processes() {
    let history = MemoryHistory::new();
    let mut mine = in_memory(&history);
    mine.uniform("x", 0.0, 1.0, 0.25).unwrap();

    // Another "process" finishes first with a better result.
    let mut other = in_memory(&history);
    other.uniform("x", 0.0, 1.0, 0.75).unwrap();
    other.minimize(0.1).unwrap();

    mine.minimize(0.2).unwrap();
    let best = mine.get_optimal_run().unwrap();
    assert_eq!(best.get_f64("x").unwrap(), 0.75);
    assert_eq!(mine.get_current_run().get_f64("x").unwrap(), 0.25);
}
