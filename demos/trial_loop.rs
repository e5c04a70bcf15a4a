//! Tune the hyperparameters of a (simulated) network training run.
//!
//! Instead of launching the script once per trial, this demo runs its own
//! trial loop: every iteration opens a fresh session against the same
//! history, declares the hyperparameters, lets the backend propose, and
//! records the simulated losses.
//!
//! Run with: `cargo run --example trial_loop -- --num-trials 20`

use bbopt::prelude::*;

struct Hyperparameters {
    hidden_neurons: i64,
    l1: f64,
    l2: f64,
    learning_rate: f64,
    decay: f64,
    momentum: f64,
    nesterov: bool,
    batch_size: i64,
}

impl Hyperparameters {
    /// Declares every hyperparameter, or reads back the proposal after `run`.
    fn from_session(bb: &mut Session) -> bbopt::Result<Self> {
        Ok(Self {
            hidden_neurons: bb.randint("hidden neurons", 1, 15, 2)?,
            l1: bb.uniform("l1", 0.0, 0.1, 0.005)?,
            l2: bb.uniform("l2", 0.0, 0.1, 0.05)?,
            learning_rate: bb.uniform("learning rate", 0.0, 0.5, 0.15)?,
            decay: bb.uniform("decay", 0.0, 0.01, 0.0005)?,
            momentum: bb.uniform("momentum", 0.0, 1.0, 0.5)?,
            nesterov: bb.getrandbits("nesterov", 1, 1)? == 1,
            batch_size: bb.randint("batch size", 1, 32, 16)?,
        })
    }
}

struct Metrics {
    training_loss: f64,
    validation_loss: f64,
    test_loss: f64,
}

/// A smooth stand-in for training: lowest near lr 0.2, momentum 0.9,
/// 8 hidden neurons, batch size 12, light regularization.
fn simulate_training(hp: &Hyperparameters) -> Metrics {
    let base = 4.0 * (hp.learning_rate - 0.2).powi(2)
        + (hp.momentum - 0.9).powi(2)
        + 0.02 * (hp.hidden_neurons - 8).abs() as f64
        + 0.005 * (hp.batch_size - 12).abs() as f64
        + 10.0 * hp.decay
        + if hp.nesterov { 0.0 } else { 0.05 };
    let regularization = 2.0 * hp.l1 + hp.l2;
    Metrics {
        training_loss: 0.05 + base,
        validation_loss: 0.1 + base + (0.02 - regularization).abs(),
        test_loss: 0.12 + base + (0.02 - regularization).abs(),
    }
}

fn run_trial(script: &str) -> bbopt::Result<RunRecord> {
    let mut bb = Session::new(script)?;
    Hyperparameters::from_session(&mut bb)?;
    bb.run("scikit-optimize")?;
    let hp = Hyperparameters::from_session(&mut bb)?;

    let metrics = simulate_training(&hp);
    bb.remember([
        ("training loss", metrics.training_loss),
        ("validation loss", metrics.validation_loss),
        ("test loss", metrics.test_loss),
    ])?;
    bb.minimize(metrics.validation_loss)?;
    Ok(bb.get_current_run().clone())
}

fn summarize(run: &RunRecord) {
    for (name, value) in &run.values {
        println!("  {name:>16}: {value}");
    }
    for (key, value) in &run.memory {
        println!("  {key:>16}: {value}");
    }
}

fn main() -> bbopt::Result<()> {
    let mut args = std::env::args().skip(1);
    let mut num_trials = 20_usize;
    while let Some(arg) = args.next() {
        if arg == "-n" || arg == "--num-trials" {
            num_trials = args
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(num_trials);
        }
    }

    let script = concat!(env!("CARGO_MANIFEST_DIR"), "/", file!());
    for i in 0..num_trials {
        let run = run_trial(script)?;
        println!("Summary of run {}/{num_trials}:", i + 1);
        summarize(&run);
        println!();
    }

    println!("Summary of best run:");
    summarize(&Session::new(script)?.get_optimal_run()?);
    Ok(())
}
