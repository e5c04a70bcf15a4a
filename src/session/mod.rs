//! The optimization session: declare parameters, run a backend, report back.

mod accessors;
mod analysis;
mod builder;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub use builder::SessionBuilder;

use crate::backend::{Backend, BackendConfig, BackendRegistry, Proposal, RandomBackend};
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::objective::{Comparison, Objective};
use crate::param::ParamValue;
use crate::parameter::{Parameter, ParameterSpace};
use crate::record::RunRecord;
use crate::storage::{HistoryStore, ScriptIdentity};
use crate::types::{Direction, SessionState};

/// One run of an experiment script.
///
/// A session passes through [`SessionState`] exactly once:
///
/// 1. **Declaring**: accessors such as [`randint`](Self::randint) register
///    parameters and answer with their guess (or domain default).
/// 2. **Active**: after [`run`](Self::run), accessors return the backend's
///    proposed values.
/// 3. **Finalized**: after [`minimize`](Self::minimize) or
///    [`maximize`](Self::maximize) the record is appended to the history and
///    only queries remain available.
///
/// A script that never calls `run` still completes: its record uses guesses
/// throughout. To run several trials in one process, build one session per
/// trial against the same script identity.
///
/// # Examples
///
/// ```
/// use bbopt::prelude::*;
///
/// let history = MemoryHistory::new();
/// let mut bb = Session::builder("toy.rs").store(history.clone()).build().unwrap();
///
/// let x0 = bb.randint("x0", 1, 10, 5).unwrap();
/// let x1 = bb.uniform("x1", 0.0, 1.0, None).unwrap();
/// bb.minimize(x0 as f64 + x1).unwrap();
///
/// assert_eq!(bb.get_optimal_run().unwrap().get_f64("x1").unwrap(), 0.5);
/// ```
pub struct Session {
    identity: ScriptIdentity,
    store: Arc<dyn HistoryStore>,
    registry: BackendRegistry,
    fallback_seed: Option<u64>,
    state: SessionState,
    space: ParameterSpace,
    /// Names declared by the script itself, as opposed to adopted from history.
    declared: HashSet<String>,
    proposal: Option<Proposal>,
    current: RunRecord,
}

impl Session {
    /// Opens a session for `script` with default settings.
    ///
    /// History is kept in a journal file next to the script.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Durability`] if the script's directory cannot be
    /// resolved.
    pub fn new(script: impl AsRef<Path>) -> Result<Self> {
        Self::builder(script).build()
    }

    /// Starts configuring a session for `script`.
    #[must_use]
    pub fn builder(script: impl AsRef<Path>) -> SessionBuilder {
        SessionBuilder::new(script.as_ref())
    }

    /// Declares a parameter, or looks up its proposed value.
    ///
    /// This is the generic entry point behind all typed accessors.
    ///
    /// Before [`run`](Self::run) the parameter is registered and its guess
    /// (or domain default) is returned. After `run` the backend's proposal
    /// is returned; the distribution must match the one declared earlier in
    /// this process, and a parameter seen only in history may be re-declared
    /// with new bounds as long as its kind is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDistribution`] for malformed arguments or a guess
    ///   outside the domain.
    /// - [`Error::DuplicateParameter`] if `name` is declared twice before `run`.
    /// - [`Error::ParameterShapeMismatch`] if the distribution disagrees with
    ///   an earlier declaration or with history.
    /// - [`Error::LateParameterDeclaration`] for a new name after `run`.
    /// - [`Error::InvalidState`] once the session is finalized.
    pub fn param(
        &mut self,
        name: &str,
        distribution: Distribution,
        guess: Option<ParamValue>,
    ) -> Result<ParamValue> {
        match self.state {
            SessionState::Declaring => self.declare(name, distribution, guess),
            SessionState::Active => self.lookup(name, distribution, guess),
            state @ SessionState::Finalized => Err(Error::InvalidState {
                operation: "declare a parameter",
                state,
            }),
        }
    }

    fn declare(
        &mut self,
        name: &str,
        distribution: Distribution,
        guess: Option<ParamValue>,
    ) -> Result<ParamValue> {
        let param = Parameter::new(name, distribution, guess)?;
        let value = param.fallback_value().clone();
        let param = self.space.declare(param)?;
        self.current
            .distributions
            .insert(name.to_string(), param.distribution().clone());
        self.current.values.insert(name.to_string(), value.clone());
        self.declared.insert(name.to_string());
        trace_debug!(name, value = %value, "parameter declared");
        Ok(value)
    }

    fn lookup(
        &mut self,
        name: &str,
        distribution: Distribution,
        guess: Option<ParamValue>,
    ) -> Result<ParamValue> {
        let param = Parameter::new(name, distribution, guess)?;
        let Some(existing) = self.space.get(name) else {
            return Err(Error::LateParameterDeclaration {
                name: name.to_string(),
            });
        };

        if self.declared.contains(name) {
            if existing.distribution() != param.distribution() {
                return Err(Error::ParameterShapeMismatch {
                    name: name.to_string(),
                    reason: "declared again with a different distribution".into(),
                });
            }
            return self.proposed(name);
        }

        // Adopted from history: the script now supplies the real declaration.
        let (expected, found) = (existing.kind(), param.kind());
        if expected != found {
            return Err(Error::kind_mismatch(name, &expected, &found));
        }
        let value = self
            .proposed(name)
            .ok()
            .and_then(|v| param.distribution().coerce(&v))
            .unwrap_or_else(|| param.fallback_value().clone());

        self.current
            .distributions
            .insert(name.to_string(), param.distribution().clone());
        self.current.values.insert(name.to_string(), value.clone());
        if let Some(proposal) = self.proposal.as_mut() {
            proposal.insert(name.to_string(), value.clone());
        }
        self.space.replace(param)?;
        self.declared.insert(name.to_string());
        Ok(value)
    }

    fn proposed(&self, name: &str) -> Result<ParamValue> {
        self.proposal
            .as_ref()
            .and_then(|p| p.get(name))
            .cloned()
            .ok_or(Error::Internal("active session without a proposed value"))
    }

    /// Activates the backend registered under `backend` and returns its
    /// proposal.
    ///
    /// History is loaded, parameters recorded there but not yet declared are
    /// adopted, and the space is validated against it before the backend is
    /// asked to propose. If the backend fails, a random proposal is used
    /// instead. Parameters the backend leaves out get their guess or domain
    /// default.
    ///
    /// Calling `run` again returns the same proposal without re-sampling.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownBackend`] if no backend is registered under `backend`,
    ///   checked on every call.
    /// - [`Error::ParameterShapeMismatch`] if the declared parameters
    ///   disagree with history.
    /// - [`Error::HistoryCorruption`] or [`Error::Durability`] if history
    ///   cannot be loaded.
    /// - [`Error::InvalidState`] if the session was finalized without `run`.
    pub fn run(&mut self, backend: &str) -> Result<&Proposal> {
        self.run_with_config(backend, &BackendConfig::new())
    }

    /// Like [`run`](Self::run), passing `config` through to the backend
    /// factory.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_config(&mut self, backend: &str, config: &BackendConfig) -> Result<&Proposal> {
        if !self.registry.contains(backend) {
            return Err(Error::UnknownBackend(backend.to_string()));
        }
        if self.proposal.is_some() {
            return self.existing_proposal();
        }
        let backend = self.registry.create(backend, config)?;
        self.activate(backend.as_ref())
    }

    /// Like [`run`](Self::run), with a ready-made backend instead of a
    /// registered name.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_backend(&mut self, backend: Box<dyn Backend>) -> Result<&Proposal> {
        if self.proposal.is_some() {
            return self.existing_proposal();
        }
        self.activate(backend.as_ref())
    }

    fn existing_proposal(&self) -> Result<&Proposal> {
        self.proposal
            .as_ref()
            .ok_or(Error::Internal("missing proposal"))
    }

    fn activate(&mut self, backend: &dyn Backend) -> Result<&Proposal> {
        if self.state != SessionState::Declaring {
            return Err(Error::InvalidState {
                operation: "run",
                state: self.state,
            });
        }

        let (space, history) = self.load_and_validate()?;
        self.space = space;
        let proposal = match backend.propose(&self.space, &history) {
            Ok(proposal) => proposal,
            #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
            Err(e) => {
                trace_warn!(error = %e, "backend failed; falling back to random sampling");
                self.fallback_backend().sample_space(&self.space)
            }
        };
        let proposal = complete(&self.space, &proposal);

        self.current.values = proposal.clone();
        self.current.distributions = distributions(&self.space);
        self.current.backend = Some(backend.name().to_string());
        self.state = SessionState::Active;
        trace_info!(
            backend = backend.name(),
            history = history.len(),
            parameters = self.space.len(),
            "run activated"
        );
        Ok(&*self.proposal.insert(proposal))
    }

    /// Loads history and returns a copy of the space with undeclared
    /// parameters adopted from it, validated against it.
    ///
    /// The session's own space is untouched, so a failure leaves it as it was.
    fn load_and_validate(&self) -> Result<(ParameterSpace, Vec<RunRecord>)> {
        let history = self.store.load()?;
        let mut space = self.space.clone();
        let adopted = space.adopt_from(&history)?;
        if !adopted.is_empty() {
            trace_debug!(?adopted, "parameters adopted from history");
        }
        space.validate_against(&history)?;
        Ok((space, history))
    }

    fn fallback_backend(&self) -> RandomBackend {
        self.fallback_seed
            .map_or_else(RandomBackend::new, RandomBackend::with_seed)
    }

    /// Merges `memory` into the current run's auxiliary values.
    ///
    /// Later keys overwrite earlier ones with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the session is finalized.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbopt::prelude::*;
    /// use serde_json::json;
    ///
    /// let mut bb = Session::builder("mem.rs").store(MemoryHistory::new()).build().unwrap();
    /// bb.remember([("epochs", json!(10)), ("optimizer", json!("adam"))]).unwrap();
    /// bb.remember([("epochs", json!(12))]).unwrap();
    /// assert_eq!(bb.get_current_run().memory["epochs"], json!(12));
    /// ```
    pub fn remember<I, K, V>(&mut self, memory: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        if self.state == SessionState::Finalized {
            return Err(Error::InvalidState {
                operation: "remember",
                state: self.state,
            });
        }
        self.current
            .memory
            .extend(memory.into_iter().map(|(k, v)| (k.into(), v.into())));
        Ok(())
    }

    /// Records `objective` to be minimized and appends the run to history.
    ///
    /// Tuples are compared lexicographically.
    ///
    /// # Errors
    ///
    /// See [`minimize_with`](Self::minimize_with).
    pub fn minimize(&mut self, objective: impl Into<Objective>) -> Result<&RunRecord> {
        self.finish(objective.into(), Direction::Minimize, Comparison::Lexicographic)
    }

    /// Records `objective` to be maximized and appends the run to history.
    ///
    /// Tuples are compared lexicographically.
    ///
    /// # Errors
    ///
    /// See [`minimize_with`](Self::minimize_with).
    pub fn maximize(&mut self, objective: impl Into<Objective>) -> Result<&RunRecord> {
        self.finish(objective.into(), Direction::Maximize, Comparison::Lexicographic)
    }

    /// Records `objective` to be minimized, ranking tuples by `comparison`.
    ///
    /// In a session that never called `run`, history is loaded here so that
    /// the guessed record is checked against the recorded parameter shapes.
    ///
    /// # Errors
    ///
    /// - [`Error::ObjectiveAlreadySet`] if feedback was already given.
    /// - [`Error::InvalidObjective`] if `objective` cannot be ranked under
    ///   `comparison`.
    /// - [`Error::ParameterShapeMismatch`] in a guess-only session whose
    ///   parameters disagree with history.
    /// - [`Error::Durability`] if the record could not be appended; the
    ///   session's state, space and current run are left unchanged and the
    ///   call may be retried.
    pub fn minimize_with(
        &mut self,
        objective: impl Into<Objective>,
        comparison: Comparison,
    ) -> Result<&RunRecord> {
        self.finish(objective.into(), Direction::Minimize, comparison)
    }

    /// Records `objective` to be maximized, ranking tuples by `comparison`.
    ///
    /// # Errors
    ///
    /// See [`minimize_with`](Self::minimize_with).
    pub fn maximize_with(
        &mut self,
        objective: impl Into<Objective>,
        comparison: Comparison,
    ) -> Result<&RunRecord> {
        self.finish(objective.into(), Direction::Maximize, comparison)
    }

    fn finish(
        &mut self,
        objective: Objective,
        direction: Direction,
        comparison: Comparison,
    ) -> Result<&RunRecord> {
        if self.state == SessionState::Finalized || self.current.objective.is_some() {
            return Err(Error::ObjectiveAlreadySet);
        }
        objective.validate(&comparison)?;

        let mut record = self.current.clone();
        let mut adopted_space = None;
        if self.state == SessionState::Declaring {
            let (space, _) = self.load_and_validate()?;
            record.values = complete(&space, &Proposal::new());
            record.distributions = distributions(&space);
            record.backend = None;
            adopted_space = Some(space);
        }
        record.objective = Some(objective);
        record.direction = Some(direction);
        record.comparison = comparison;

        let stored = self.store.append(record)?;
        trace_info!(
            sequence_index = stored.sequence_index,
            direction = %direction,
            "run recorded"
        );
        if let Some(space) = adopted_space {
            self.space = space;
        }
        self.current = stored;
        self.state = SessionState::Finalized;
        Ok(&self.current)
    }

    /// The lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The script this session belongs to.
    #[must_use]
    pub fn identity(&self) -> &ScriptIdentity {
        &self.identity
    }

    /// The parameters declared or adopted so far.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// The backend's proposal, once [`run`](Self::run) has been called.
    #[must_use]
    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }
}

/// One in-domain value per parameter: the proposed one if valid, otherwise
/// the guess or domain default.
fn complete(space: &ParameterSpace, proposal: &Proposal) -> Proposal {
    space
        .iter()
        .map(|p| {
            let value = proposal
                .get(p.name())
                .and_then(|v| p.distribution().coerce(v))
                .unwrap_or_else(|| p.fallback_value().clone());
            (p.name().to_string(), value)
        })
        .collect()
}

fn distributions(space: &ParameterSpace) -> BTreeMap<String, Distribution> {
    space
        .iter()
        .map(|p| (p.name().to_string(), p.distribution().clone()))
        .collect()
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("space", &self.space)
            .field("proposal", &self.proposal)
            .finish_non_exhaustive()
    }
}
