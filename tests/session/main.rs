#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod feedback;
mod guess_only;
mod lifecycle;
mod optimal;
mod persistence;
mod shape;

use bbopt::prelude::*;

/// A fresh script path in the temp directory; its history does not exist yet.
fn temp_script() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut path = std::env::temp_dir();
    path.push(format!(
        "bbopt_session_test_{}_{}.rs",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

/// Removes the history written next to `script`.
fn cleanup(script: &std::path::Path) {
    if let Ok(identity) = bbopt::storage::ScriptIdentity::new(script) {
        std::fs::remove_file(identity.history_path()).ok();
    }
}

/// A session over an in-memory history shared by all clones of `history`.
fn in_memory(history: &MemoryHistory) -> Session {
    Session::builder("session_tests.rs")
        .store(history.clone())
        .fallback_seed(11)
        .build()
        .expect("session should build")
}
