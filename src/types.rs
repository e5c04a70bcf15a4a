//! Core types for the session engine.

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Minimize => f.write_str("minimize"),
            Self::Maximize => f.write_str("maximize"),
        }
    }
}

/// The lifecycle state of a [`Session`](crate::Session).
///
/// A session moves `Declaring -> Active -> Finalized` at most once; a script
/// that never calls `run` goes straight from `Declaring` to `Finalized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Parameters are being registered and answered with guesses.
    Declaring,
    /// A backend has proposed values; accessors look them up.
    Active,
    /// The run has been recorded; only queries are accepted.
    Finalized,
}

impl core::fmt::Display for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Declaring => f.write_str("declaring"),
            Self::Active => f.write_str("active"),
            Self::Finalized => f.write_str("finalized"),
        }
    }
}
