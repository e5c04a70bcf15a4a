use std::time::{Duration, Instant};

use bbopt::prelude::*;

fn gp_config(seed: u64) -> BackendConfig {
    BackendConfig::new()
        .with("seed", seed)
        .with("n_startup_trials", 5)
        .with("n_candidates", 500)
}

/// One trial of minimizing `(x - 0.3)^2 + (y - 0.7)^2`.
fn trial(history: &MemoryHistory, seed: u64) -> f64 {
    let mut bb = Session::builder("gp_tests.rs")
        .store(history.clone())
        .fallback_seed(seed)
        .build()
        .unwrap();
    bb.uniform("x", 0.0, 1.0, None).unwrap();
    bb.uniform("y", 0.0, 1.0, None).unwrap();
    bb.run_with_config("gp", &gp_config(seed)).unwrap();
    let x = bb.uniform("x", 0.0, 1.0, None).unwrap();
    let y = bb.uniform("y", 0.0, 1.0, None).unwrap();
    let value = (x - 0.3).powi(2) + (y - 0.7).powi(2);
    bb.minimize(value).unwrap();
    value
}

#[test]
fn test_gp_backend_improves_on_startup_samples() {
    let history = MemoryHistory::new();
    let values: Vec<f64> = (0..25).map(|i| trial(&history, i)).collect();

    let startup_best = values[..5].iter().copied().fold(f64::INFINITY, f64::min);
    let overall_best = values.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(overall_best <= startup_best);
    assert!(overall_best < 0.05, "best value {overall_best} should approach 0");

    let best = Session::builder("gp_tests.rs")
        .store(history.clone())
        .build()
        .unwrap()
        .get_optimal_run()
        .unwrap();
    assert_eq!(best.objective, Some(Objective::Scalar(overall_best)));
    assert_eq!(best.backend.as_deref(), Some("gp"));
}

#[test]
fn test_gp_backend_handles_maximize_and_categoricals() {
    let history = MemoryHistory::new();
    for seed in 0..12 {
        let mut bb = Session::builder("gp_mixed.rs")
            .store(history.clone())
            .build()
            .unwrap();
        bb.randint("depth", 1, 8, None).unwrap();
        bb.choice("kind", ["tree", "forest"], None).unwrap();
        bb.run_with_config("skopt", &gp_config(seed)).unwrap();
        let depth = bb.randint("depth", 1, 8, None).unwrap();
        let kind = bb.choice("kind", ["tree", "forest"], None).unwrap();
        assert!((1..=8).contains(&depth));
        assert!(kind == "tree".into() || kind == "forest".into());
        bb.maximize(-((depth - 4) as f64).abs()).unwrap();
    }
    assert_eq!(history.len(), 12);
}

#[test]
fn test_gp_backend_respects_time_budget() {
    let mut space = ParameterSpace::new();
    for name in ["a", "b", "c"] {
        space
            .declare(Parameter::new(name, Distribution::float(-1.0, 1.0), None).unwrap())
            .unwrap();
    }
    let history: Vec<RunRecord> = (0..20_u32)
        .map(|i| {
            let v = f64::from(i) / 20.0;
            let mut run = RunRecord {
                sequence_index: Some(u64::from(i)),
                objective: Some(Objective::Scalar(v)),
                direction: Some(Direction::Minimize),
                ..RunRecord::default()
            };
            for name in ["a", "b", "c"] {
                run.values.insert(name.into(), ParamValue::Float(v * 2.0 - 1.0));
                run.distributions
                    .insert(name.into(), Distribution::float(-1.0, 1.0));
            }
            run
        })
        .collect();

    let backend = GpBackend::builder()
        .n_candidates(10_000_000)
        .time_budget(Duration::from_millis(50))
        .seed(1)
        .build();
    let start = Instant::now();
    let proposal = backend.propose(&space, &history).unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(proposal.len(), 3);
}
