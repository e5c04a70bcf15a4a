use bbopt::prelude::*;

/// Runs `n` single-parameter trials with a seeded random backend and
/// returns the proposed values.
fn sample_many(n: usize, declare: impl Fn(&mut Session) -> f64) -> Vec<f64> {
    let history = MemoryHistory::new();
    (0..n)
        .map(|i| {
            let mut bb = Session::builder("random_tests.rs")
                .store(history.clone())
                .build()
                .unwrap();
            declare(&mut bb);
            bb.run_with_config("random", &BackendConfig::new().with("seed", i as u64))
                .unwrap();
            let value = declare(&mut bb);
            bb.minimize(value).unwrap();
            value
        })
        .collect()
}

#[test]
fn test_random_backend_uniform_float_distribution() {
    let mut samples = sample_many(1000, |bb| bb.uniform("x", 0.0, 1.0, None).unwrap());

    for &s in &samples {
        assert!((0.0..=1.0).contains(&s), "sample {s} out of range [0, 1]");
    }

    samples.sort_by(f64::total_cmp);
    let q1 = samples[250];
    let q2 = samples[500];
    let q3 = samples[750];
    assert!((q1 - 0.25).abs() < 0.1, "Q1 {q1} should be close to 0.25");
    assert!((q2 - 0.5).abs() < 0.1, "Q2 {q2} should be close to 0.5");
    assert!((q3 - 0.75).abs() < 0.1, "Q3 {q3} should be close to 0.75");
}

#[test]
fn test_random_backend_int_covers_range() {
    let samples = sample_many(500, |bb| bb.randint("n", 1, 10, None).unwrap() as f64);
    let mut counts = [0u32; 10];
    for s in samples {
        counts[s as usize - 1] += 1;
    }
    for (i, &c) in counts.iter().enumerate() {
        assert!(c > 0, "value {} was never proposed", i + 1);
    }
}

#[test]
fn test_random_backend_bits_and_loguniform_stay_in_domain() {
    let bits = sample_many(200, |bb| bb.getrandbits("b", 5, None).unwrap() as f64);
    assert!(bits.iter().all(|&b| (0.0..32.0).contains(&b)));

    let lr = sample_many(200, |bb| bb.loguniform("lr", 1e-5, 1e-1, None).unwrap());
    assert!(lr.iter().all(|&v| (1e-5..=1e-1).contains(&v)));
    // Log-uniform: about half the mass lies below the geometric mean.
    let below = lr.iter().filter(|&&v| v < 1e-3).count();
    assert!((60..140).contains(&below), "{below} of 200 below 1e-3");
}

#[test]
fn test_random_backend_seed_is_reproducible() {
    let propose = |seed: u64| {
        let mut bb = Session::builder("seeded.rs")
            .store(MemoryHistory::new())
            .build()
            .unwrap();
        bb.uniform("x", -1.0, 1.0, None).unwrap();
        bb.choice("c", ["a", "b", "c"], None).unwrap();
        bb.run_with_config("random", &BackendConfig::new().with("seed", seed))
            .unwrap()
            .clone()
    };
    assert_eq!(propose(9), propose(9));
    assert_ne!(propose(9), propose(10));
}
