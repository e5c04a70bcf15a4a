use crate::distribution::DistributionKind;

/// Errors surfaced by a [`Session`](crate::Session) and its collaborators.
///
/// Declaration and feedback errors indicate a bug in the calling script and
/// are never retried. Persistence failures are retried by the journal store
/// before surfacing as [`Error::Durability`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a parameter name is declared twice before `run`.
    #[error("parameter '{name}' is already declared in this run")]
    DuplicateParameter {
        /// The duplicated parameter name.
        name: String,
    },

    /// Returned when distribution arguments or a guess are malformed.
    #[error("invalid distribution for '{name}': {reason}")]
    InvalidDistribution {
        /// The parameter being declared.
        name: String,
        /// What is wrong with the declaration.
        reason: String,
    },

    /// Returned when a parameter disagrees with the shape recorded in history.
    #[error("parameter shape mismatch for '{name}': {reason}")]
    ParameterShapeMismatch {
        /// The parameter whose shape differs.
        name: String,
        /// How the shapes differ.
        reason: String,
    },

    /// Returned by `run` when no backend is registered under the given name.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// Returned when a new parameter is declared after the backend proposed.
    #[error("parameter '{name}' was declared after the backend already proposed values")]
    LateParameterDeclaration {
        /// The late parameter name.
        name: String,
    },

    /// Returned by a second `minimize`/`maximize` call.
    #[error("the objective of this run is already set")]
    ObjectiveAlreadySet,

    /// Returned when an objective cannot be ranked (empty tuple, wrong weight count).
    #[error("invalid objective: {0}")]
    InvalidObjective(String),

    /// Returned when no run in the history has a completed objective.
    #[error("no completed runs in history")]
    EmptyHistory,

    /// Returned when the persisted history cannot be read back.
    #[error("history corrupted at line {line}: {reason}")]
    HistoryCorruption {
        /// One-based line number of the unreadable record.
        line: usize,
        /// Why the record could not be decoded.
        reason: String,
    },

    /// Returned when a record could not be durably appended.
    #[error("history write failed: {0}")]
    Durability(String),

    /// Returned when an operation is not allowed in the session's state.
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The session state at the time of the call.
        state: crate::types::SessionState,
    },

    /// Returned when a typed accessor reads a value of the wrong type.
    #[error("parameter '{name}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        /// The parameter name.
        name: String,
        /// The expected value type.
        expected: &'static str,
        /// The value type actually stored.
        found: &'static str,
    },

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl Error {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn kind_mismatch(
        name: &str,
        expected: &DistributionKind,
        found: &DistributionKind,
    ) -> Self {
        Self::ParameterShapeMismatch {
            name: name.to_string(),
            reason: format!("history records it as {expected}, declared as {found}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Failure of a backend to produce a proposal.
///
/// Backends return this from [`Backend::propose`](crate::backend::Backend::propose);
/// the session logs it and falls back to random sampling instead of
/// surfacing it.
#[derive(Debug, thiserror::Error)]
#[error("backend '{backend}' could not propose: {reason}")]
pub struct ProposalError {
    /// Name of the failing backend.
    pub backend: String,
    /// Why the proposal failed.
    pub reason: String,
}

impl ProposalError {
    /// Creates a proposal error for the named backend.
    #[must_use]
    pub fn new(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}
