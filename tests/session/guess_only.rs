use bbopt::prelude::*;

use crate::{cleanup, in_memory, temp_script};

#[test]
fn guess_only_scenario_records_one_run() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);

    let x0 = bb.randint("x0", 1, 10, 5).unwrap();
    let x1 = bb.uniform("x1", 0.0, 1.0, None).unwrap();
    assert_eq!(x0, 5);
    assert_eq!(x1, 0.5);

    let record = bb.minimize(x0 as f64 + x1).unwrap().clone();
    assert_eq!(record.objective, Some(Objective::Scalar(5.5)));
    assert_eq!(record.direction, Some(Direction::Minimize));
    assert_eq!(record.values["x0"], ParamValue::Int(5));
    assert_eq!(record.values["x1"], ParamValue::Float(0.5));
    assert_eq!(record.backend, None);
    assert_eq!(history.len(), 1);
    assert_eq!(bb.state(), SessionState::Finalized);
}

#[test]
fn guess_only_against_a_journal_file() {
    let script = temp_script();
    {
        let mut bb = Session::new(&script).unwrap();
        let lr = bb.loguniform("lr", 1e-4, 1e-1, 1e-3).unwrap();
        let layers = bb.randint("layers", 1, 4, None).unwrap();
        assert_eq!(lr, 1e-3);
        assert_eq!(layers, 2);
        bb.maximize(0.9).unwrap();
    }

    let bb = Session::new(&script).unwrap();
    let runs = bb.history().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].sequence_index, Some(0));
    assert_eq!(runs[0].get_f64("lr").unwrap(), 1e-3);
    assert_eq!(runs[0].direction, Some(Direction::Maximize));

    cleanup(&script);
}

#[test]
fn guess_only_run_fills_in_parameters_from_history() {
    let history = MemoryHistory::new();

    let mut first = in_memory(&history);
    first.randint("a", 0, 10, 7).unwrap();
    first.uniform("b", 0.0, 2.0, None).unwrap();
    first.minimize(1.0).unwrap();

    // The second run only declares `a`; `b` is adopted with its default.
    let mut second = in_memory(&history);
    second.randint("a", 0, 10, 7).unwrap();
    let record = second.minimize(2.0).unwrap();
    assert_eq!(record.values["b"], ParamValue::Float(1.0));
    assert_eq!(history.len(), 2);
}

#[test]
fn guess_only_without_parameters() {
    let history = MemoryHistory::new();
    let mut bb = in_memory(&history);
    bb.remember([("status", "smoke test")]).unwrap();
    let record = bb.minimize(0.0).unwrap();
    assert!(record.values.is_empty());
    assert_eq!(record.memory["status"], serde_json::json!("smoke test"));
}
