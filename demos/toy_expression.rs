//! Tune a toy arithmetic expression, one trial per invocation.
//!
//! History accumulates next to this file in `toy_expression.rs.bbopt.jsonl`, so
//! running the demo repeatedly lets the GP backend home in on the minimum.
//! Pass `--guess` to evaluate the guesses without activating a backend.
//!
//! Run with: `cargo run --example toy_expression`

use bbopt::prelude::*;

fn main() -> bbopt::Result<()> {
    let script = concat!(env!("CARGO_MANIFEST_DIR"), "/", file!());
    let mut bb = Session::new(script)?;

    // Let's use some parameters!
    bb.param("x0", Distribution::int(1, 10), Some(5.into()))?;
    bb.param("x1", Distribution::float(0.0, 1.0), None)?;

    if !std::env::args().any(|arg| arg == "--guess") {
        bb.run("scikit-optimize")?;
    }

    // And let's set our goal!
    let run = bb.get_current_run();
    let y = run.get_f64("x0")? + run.get_f64("x1")?;
    bb.minimize(y)?;

    println!("{y:?}");
    println!("runs so far: {}", bb.n_runs()?);
    let best = bb.get_optimal_run()?;
    println!(
        "best: x0 = {}, x1 = {}, y = {:?}",
        best.values["x0"], best.values["x1"], best.objective
    );
    Ok(())
}
