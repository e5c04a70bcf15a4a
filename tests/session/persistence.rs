use std::io::Write;

use bbopt::prelude::*;
use bbopt::storage::ScriptIdentity;
use serde_json::json;

use crate::{cleanup, temp_script};

fn record_trial(script: &std::path::Path, trial: i64) -> RunRecord {
    let mut bb = Session::new(script).unwrap();
    bb.randint("trial", 0, 1_000, trial).unwrap();
    bb.choice("flag", [true, false], trial % 2 == 0).unwrap();
    bb.remember([("label", json!(format!("trial-{trial}")))])
        .unwrap();
    bb.minimize(trial as f64 * 0.5).unwrap().clone()
}

#[test]
fn journal_round_trip_through_sessions() {
    let script = temp_script();
    let written: Vec<RunRecord> = (0..6).map(|t| record_trial(&script, t)).collect();

    let loaded = Session::new(&script).unwrap().history().unwrap();
    assert_eq!(loaded, written);
    for (i, run) in loaded.iter().enumerate() {
        assert_eq!(run.sequence_index, Some(i as u64));
        assert_eq!(run.get_i64("trial").unwrap(), i as i64);
        assert_eq!(run.values["flag"], ParamValue::Bool(i % 2 == 0));
    }

    cleanup(&script);
}

#[test]
fn scripts_at_different_paths_do_not_share_history() {
    let a = temp_script();
    let b = temp_script();
    record_trial(&a, 1);
    record_trial(&a, 2);
    record_trial(&b, 3);

    assert_eq!(Session::new(&a).unwrap().n_runs().unwrap(), 2);
    assert_eq!(Session::new(&b).unwrap().n_runs().unwrap(), 1);

    cleanup(&a);
    cleanup(&b);
}

#[test]
fn concurrent_sessions_never_lose_records() {
    let script = temp_script();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let script = script.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    record_trial(&script, worker * 10 + i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let runs = Session::new(&script).unwrap().history().unwrap();
    assert_eq!(runs.len(), 40);
    let indices: Vec<u64> = runs.iter().map(|r| r.sequence_index.unwrap()).collect();
    assert_eq!(indices, (0..40).collect::<Vec<_>>());
    let mut trials: Vec<i64> = runs.iter().map(|r| r.get_i64("trial").unwrap()).collect();
    trials.sort_unstable();
    assert_eq!(trials, (0..40).collect::<Vec<_>>());

    cleanup(&script);
}

#[test]
fn torn_trailing_record_is_recovered() {
    let script = temp_script();
    record_trial(&script, 1);
    record_trial(&script, 2);

    let path = ScriptIdentity::new(&script).unwrap().history_path();
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"values":{"trial":{"int":3}},"distrib"#)
            .unwrap();
    }

    // Readers skip the torn record.
    assert_eq!(Session::new(&script).unwrap().n_runs().unwrap(), 2);

    // The next append cuts it off and continues the sequence.
    let next = record_trial(&script, 4);
    assert_eq!(next.sequence_index, Some(2));
    let runs = Session::new(&script).unwrap().history().unwrap();
    assert_eq!(runs.len(), 3);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(!text.contains("distrib\n"));

    cleanup(&script);
}

#[test]
fn interior_corruption_is_reported() {
    let script = temp_script();
    record_trial(&script, 1);
    let path = ScriptIdentity::new(&script).unwrap().history_path();
    let intact = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, format!("{intact}not json\n{intact}")).unwrap();

    let err = Session::new(&script).unwrap().history().unwrap_err();
    assert!(matches!(err, Error::HistoryCorruption { line: 2, .. }));

    // Appends refuse to build on a corrupted history.
    let mut bb = Session::new(&script).unwrap();
    bb.randint("trial", 0, 1_000, 5).unwrap();
    assert!(matches!(
        bb.minimize(1.0),
        Err(Error::HistoryCorruption { .. })
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);

    cleanup(&script);
}

#[test]
fn non_finite_objectives_are_kept() {
    let script = temp_script();
    let objectives = [f64::NAN, 1.0, f64::INFINITY];
    for (i, objective) in objectives.into_iter().enumerate() {
        let mut bb = Session::new(&script).unwrap();
        let stored = bb.minimize(objective).unwrap();
        assert_eq!(stored.sequence_index, Some(i as u64));
        assert_eq!(Session::new(&script).unwrap().n_runs().unwrap(), i + 1);
    }

    let path = ScriptIdentity::new(&script).unwrap().history_path();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(!text.contains("null"));

    let bb = Session::new(&script).unwrap();
    let history = bb.history().unwrap();
    assert!(history[0].objective.as_ref().unwrap().values()[0].is_nan());
    assert_eq!(
        history[2].objective.as_ref().unwrap().as_scalar(),
        Some(f64::INFINITY)
    );
    let order: Vec<_> = bb
        .top_runs(3)
        .unwrap()
        .iter()
        .map(|r| r.sequence_index.unwrap())
        .collect();
    assert_eq!(order, vec![1, 2, 0]);

    cleanup(&script);
}

fn declare_extremes(bb: &mut Session) -> (f64, i64, i64) {
    let wide = bb.uniform("wide", -f64::MAX, f64::MAX, None).unwrap();
    let full = bb.randint("full", i64::MIN, i64::MAX, 0).unwrap();
    let upper = bb.randint("upper", -(1 << 62), i64::MAX, None).unwrap();
    (wide, full, upper)
}

#[test]
fn extreme_domains_round_trip_through_the_journal() {
    let script = temp_script();
    let mut bb = Session::new(&script).unwrap();
    assert_eq!(declare_extremes(&mut bb), (0.0, 0, (1 << 61) - 1));
    bb.minimize(f64::NAN).unwrap();

    let config = BackendConfig::new()
        .with("seed", 5)
        .with("n_startup_trials", 2)
        .with("n_candidates", 50);
    let backends = ["random", "random", "random", "gp", "gp"];
    for (trial, backend) in backends.into_iter().enumerate() {
        let mut bb = Session::builder(&script).fallback_seed(3).build().unwrap();
        declare_extremes(&mut bb);
        bb.run_with_config(backend, &config).unwrap();
        let (wide, _, upper) = declare_extremes(&mut bb);
        assert!(wide.is_finite());
        assert!(upper >= -(1 << 62));
        bb.minimize(trial as f64).unwrap();
    }

    let history = Session::new(&script).unwrap().history().unwrap();
    assert_eq!(history.len(), 6);
    for run in &history {
        assert!(run.get_f64("wide").unwrap().is_finite());
    }

    cleanup(&script);
}
