use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::{Backend, BackendConfig, GpBackend, GuessBackend, RandomBackend};
use crate::error::{Error, Result};

/// Builds a backend from pass-through configuration.
pub type BackendFactory = Arc<dyn Fn(&BackendConfig) -> Box<dyn Backend> + Send + Sync>;

/// Maps backend names to factories.
///
/// [`BackendRegistry::default`] knows the built-in backends; additional
/// backends are added with [`register`](Self::register) and are looked up
/// exactly like the built-ins.
///
/// # Examples
///
/// ```
/// use bbopt::backend::{BackendConfig, BackendRegistry, RandomBackend};
///
/// let mut registry = BackendRegistry::default();
/// registry.register("my-random", |config: &BackendConfig| {
///     Box::new(RandomBackend::with_seed(config.u64("seed").unwrap_or(0)))
/// });
///
/// assert!(registry.contains("my-random"));
/// assert!(registry.create("nonexistent", &BackendConfig::new()).is_err());
/// ```
#[derive(Clone)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Creates a registry without any backends.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&BackendConfig) -> Box<dyn Backend> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Returns `true` if a backend is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiates the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] if nothing is registered under `name`.
    pub fn create(&self, name: &str, config: &BackendConfig) -> Result<Box<dyn Backend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        Ok(factory(config))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for name in ["guess", "none"] {
            registry.register(name, |_: &BackendConfig| Box::new(GuessBackend));
        }
        registry.register("random", |config: &BackendConfig| {
            Box::new(
                config
                    .u64("seed")
                    .map_or_else(RandomBackend::new, RandomBackend::with_seed),
            )
        });
        for name in ["gp", "bayesian", "scikit-optimize", "skopt"] {
            registry.register(name, |config: &BackendConfig| {
                Box::new(GpBackend::from_config(config))
            });
        }
        registry
    }
}

impl core::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
