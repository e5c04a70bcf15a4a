//! Random backend implementation.

use parking_lot::Mutex;

use crate::backend::common::sample_random;
use crate::backend::{Backend, Proposal};
use crate::error::ProposalError;
use crate::parameter::ParameterSpace;
use crate::record::RunRecord;

/// A backend that samples every parameter independently and uniformly.
///
/// History is ignored. Integer ranges respect their step, log-uniform
/// ranges are sampled uniformly in log space, normal parameters are drawn
/// from their normal distribution, and choices are picked uniformly. Custom
/// distributions are left out of the proposal so that their guess is used.
///
/// This is also the fallback whenever another backend cannot propose.
///
/// # Examples
///
/// ```
/// use bbopt::backend::RandomBackend;
///
/// // Create with default RNG
/// let backend = RandomBackend::new();
///
/// // Create with a fixed seed for reproducibility
/// let backend = RandomBackend::with_seed(42);
/// ```
pub struct RandomBackend {
    rng: Mutex<fastrand::Rng>,
}

impl RandomBackend {
    /// Creates a new random backend with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random backend with a fixed seed for reproducibility.
    ///
    /// Using the same seed will produce the same sequence of proposals for
    /// the same parameter space.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub(crate) fn sample_space(&self, space: &ParameterSpace) -> Proposal {
        let mut rng = self.rng.lock();
        space
            .iter()
            .filter_map(|p| {
                sample_random(&mut rng, p.distribution()).map(|v| (p.name().to_string(), v))
            })
            .collect()
    }
}

impl Default for RandomBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RandomBackend {
    fn name(&self) -> &str {
        "random"
    }

    fn propose(
        &self,
        space: &ParameterSpace,
        _history: &[RunRecord],
    ) -> Result<Proposal, ProposalError> {
        Ok(self.sample_space(space))
    }
}
