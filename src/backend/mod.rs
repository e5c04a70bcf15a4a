//! Backend trait and built-in search strategies.
//!
//! A [`Backend`] turns the declared [`ParameterSpace`] and the recorded
//! history into a [`Proposal`]: one concrete value per parameter for the next
//! run. Backends are rebuilt in every process, so any model state they need
//! is derived from the history on each call.
//!
//! # Built-in backends
//!
//! | Backend | Registry names | Strategy |
//! |---------|----------------|----------|
//! | [`GuessBackend`] | `guess`, `none` | Every parameter's guess or domain default |
//! | [`RandomBackend`] | `random` | Independent uniform sampling per distribution |
//! | [`GpBackend`] | `gp`, `bayesian`, `scikit-optimize`, `skopt` | Gaussian-process surrogate + Expected Improvement |
//!
//! # Declining and failing
//!
//! A proposal may leave parameters out; the session fills those in with the
//! parameter's guess or domain default. A backend that cannot propose at all
//! returns a [`ProposalError`]; the session then falls back to a
//! [`RandomBackend`] proposal rather than blocking the run.
//!
//! # Implementing a custom backend
//!
//! ```
//! use bbopt::backend::{Backend, Proposal};
//! use bbopt::parameter::ParameterSpace;
//! use bbopt::{ProposalError, RunRecord};
//!
//! /// Re-proposes the values of the most recent run.
//! struct Repeat;
//!
//! impl Backend for Repeat {
//!     fn name(&self) -> &str {
//!         "repeat"
//!     }
//!
//!     fn propose(
//!         &self,
//!         _space: &ParameterSpace,
//!         history: &[RunRecord],
//!     ) -> Result<Proposal, ProposalError> {
//!         history
//!             .last()
//!             .map(|run| run.values.clone())
//!             .ok_or_else(|| ProposalError::new("repeat", "no previous run"))
//!     }
//! }
//! ```

mod common;
mod gp;
mod guess;
mod random;
mod registry;

use std::collections::BTreeMap;

pub use gp::{GpBackend, GpBackendBuilder};
pub use guess::GuessBackend;
pub use random::RandomBackend;
pub use registry::{BackendFactory, BackendRegistry};

use crate::error::ProposalError;
use crate::param::ParamValue;
use crate::parameter::ParameterSpace;
use crate::record::RunRecord;

/// Proposed values for the next run, keyed by parameter name.
pub type Proposal = BTreeMap<String, ParamValue>;

/// A search strategy that proposes parameter values from run history.
///
/// Implementations must be `Send + Sync`; they are used from a single thread
/// but may be stored in shared registries.
pub trait Backend: Send + Sync {
    /// The name this backend is reported under in run records.
    fn name(&self) -> &str;

    /// Proposes values for the parameters of `space`.
    ///
    /// `history` contains every recorded run of the script, completed or
    /// not, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns a [`ProposalError`] when no proposal can be made; the caller
    /// falls back to random sampling.
    fn propose(
        &self,
        space: &ParameterSpace,
        history: &[RunRecord],
    ) -> Result<Proposal, ProposalError>;
}

/// Free-form, backend-specific configuration passed through `run`.
///
/// The session only checks the backend name; keys are interpreted by the
/// backend factory. Built-in backends read `seed`, and the GP backend also
/// reads `n_startup_trials`, `n_candidates`, `noise_variance`, and
/// `time_budget_ms`. Keys with an unexpected type are ignored.
///
/// ```
/// use bbopt::backend::BackendConfig;
///
/// let config = BackendConfig::new().with("seed", 42).with("n_candidates", 200);
/// assert_eq!(config.u64("seed"), Some(42));
/// assert_eq!(config.u64("missing"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendConfig {
    entries: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// The raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// The value under `key` as an unsigned integer.
    #[must_use]
    pub fn u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(serde_json::Value::as_u64)
    }

    /// The value under `key` as a `usize`.
    #[must_use]
    pub fn usize(&self, key: &str) -> Option<usize> {
        self.u64(key).and_then(|v| usize::try_from(v).ok())
    }

    /// The value under `key` as a float.
    #[must_use]
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Returns `true` if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for BackendConfig {
    fn from(entries: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for BackendConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
