use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::BackendRegistry;
use crate::error::Result;
use crate::parameter::ParameterSpace;
use crate::record::RunRecord;
use crate::storage::{HistoryStore, JournalHistory, LockPolicy, ScriptIdentity};
use crate::types::SessionState;

use super::Session;

/// A builder for constructing [`Session`] instances with a fluent API.
///
/// Created via [`Session::builder()`].
///
/// # Defaults
///
/// - Store: [`JournalHistory`] at the script's
///   [`history_path`](ScriptIdentity::history_path)
/// - Registry: [`BackendRegistry::default`] (the built-in backends)
/// - Lock policy: [`LockPolicy::default`]
/// - Fallback seed: none, so fallback proposals are not reproducible
///
/// # Examples
///
/// ```
/// use bbopt::prelude::*;
///
/// let session = Session::builder("train.rs")
///     .store(MemoryHistory::new())
///     .fallback_seed(42)
///     .build()
///     .unwrap();
///
/// assert_eq!(session.state(), SessionState::Declaring);
/// ```
pub struct SessionBuilder {
    script: PathBuf,
    store: Option<Arc<dyn HistoryStore>>,
    registry: Option<BackendRegistry>,
    lock_policy: LockPolicy,
    fallback_seed: Option<u64>,
}

impl SessionBuilder {
    pub(super) fn new(script: &Path) -> Self {
        Self {
            script: script.to_path_buf(),
            store: None,
            registry: None,
            lock_policy: LockPolicy::default(),
            fallback_seed: None,
        }
    }

    /// Set a custom history store.
    ///
    /// Defaults to a [`JournalHistory`] next to the script.
    #[must_use]
    pub fn store(self, store: impl HistoryStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Set a history store that is shared with other owners.
    #[must_use]
    pub fn shared_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the registry that `run` resolves backend names against.
    #[must_use]
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the lock retry policy of the default journal store.
    ///
    /// Ignored when a custom store is set.
    #[must_use]
    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Seed the random backend used when the active backend fails.
    #[must_use]
    pub fn fallback_seed(mut self, seed: u64) -> Self {
        self.fallback_seed = Some(seed);
        self
    }

    /// Build the [`Session`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Durability`](crate::Error::Durability) if the
    /// script's directory cannot be resolved.
    pub fn build(self) -> Result<Session> {
        let identity = ScriptIdentity::new(&self.script)?;
        let store = self.store.unwrap_or_else(|| {
            Arc::new(JournalHistory::for_script(&identity).with_lock_policy(self.lock_policy))
        });
        trace_debug!(script = %identity, "session opened");

        Ok(Session {
            identity,
            store,
            registry: self.registry.unwrap_or_default(),
            fallback_seed: self.fallback_seed,
            state: SessionState::Declaring,
            space: ParameterSpace::new(),
            declared: HashSet::new(),
            proposal: None,
            current: RunRecord::default(),
        })
    }
}

impl core::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("script", &self.script)
            .field("custom_store", &self.store.is_some())
            .field("registry", &self.registry)
            .field("lock_policy", &self.lock_policy)
            .field("fallback_seed", &self.fallback_seed)
            .finish()
    }
}
