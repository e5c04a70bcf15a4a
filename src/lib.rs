#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Black-box optimization sessions for experiment scripts.
//!
//! Declare tunable parameters inline in a script, let a backend propose
//! values for them, run the experiment, and report the outcome. Every run is
//! appended to a history file that lives next to the script, so each new
//! invocation proposes from everything that happened before, even when
//! runs are separate processes started by a shell loop.
//!
//! # Getting Started
//!
//! ```
//! use bbopt::prelude::*;
//!
//! # let history = MemoryHistory::new();
//! let mut bb = Session::builder("experiment.rs")
//! #   .store(history.clone())
//!     .build()
//!     .unwrap();
//!
//! // Declaring answers with the guess (or the domain default).
//! bb.randint("x0", 1, 10, 5).unwrap();
//! bb.uniform("x1", 0.0, 1.0, None).unwrap();
//!
//! // After `run`, the same calls answer with the backend's proposal.
//! bb.run("random").unwrap();
//! let x0 = bb.randint("x0", 1, 10, 5).unwrap();
//! let x1 = bb.uniform("x1", 0.0, 1.0, None).unwrap();
//!
//! bb.remember([("note", "toy expression")]).unwrap();
//! bb.minimize(x0 as f64 + x1).unwrap();
//!
//! let best = bb.get_optimal_run().unwrap();
//! println!("best so far: {:?}", best.objective);
//! ```
//!
//! Without [`run`](Session::run) the script still works: every accessor
//! returns its guess, or the domain default when no guess is given.
//!
//! Once a script has history, `run` may also come first: parameters
//! recorded by earlier runs are adopted and proposed for before the script
//! declares them again.
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Session`] | One run of a script: declare, run, report, query. |
//! | [`Distribution`](distribution::Distribution) | The domain of a parameter: integer range, float range, log-uniform, normal, bits, choice, or custom. |
//! | [`Backend`](backend::Backend) | Strategy turning history into a proposal ([`GuessBackend`](backend::GuessBackend), [`RandomBackend`](backend::RandomBackend), [`GpBackend`](backend::GpBackend)). |
//! | [`HistoryStore`](storage::HistoryStore) | Append-only run log ([`JournalHistory`](storage::JournalHistory), [`MemoryHistory`](storage::MemoryHistory)). |
//! | [`RunRecord`] | One run's values, memory, objective, and direction. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at run activation, backend fallback, appends, and journal recovery | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod distribution;
mod error;
pub mod objective;
mod param;
pub mod parameter;
mod record;
mod rng_util;
mod session;
pub mod storage;
mod types;

pub use error::{Error, ProposalError, Result};
pub use objective::{Comparison, Objective};
pub use param::ParamValue;
pub use record::RunRecord;
pub use session::{Session, SessionBuilder};
pub use types::{Direction, SessionState};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use bbopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{
        Backend, BackendConfig, BackendRegistry, GpBackend, GuessBackend, Proposal, RandomBackend,
    };
    pub use crate::distribution::Distribution;
    pub use crate::error::{Error, ProposalError, Result};
    pub use crate::objective::{Comparison, Objective};
    pub use crate::param::ParamValue;
    pub use crate::parameter::{Parameter, ParameterSpace};
    pub use crate::record::RunRecord;
    pub use crate::session::{Session, SessionBuilder};
    pub use crate::storage::{HistoryStore, JournalHistory, LockPolicy, MemoryHistory};
    pub use crate::types::{Direction, SessionState};
}
