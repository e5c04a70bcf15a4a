use crate::backend::{Backend, Proposal};
use crate::error::ProposalError;
use crate::parameter::ParameterSpace;
use crate::record::RunRecord;

/// Proposes every parameter's guess, or its domain default when no guess is
/// declared.
///
/// This is what a session uses when `run` is never called. See
/// [`Distribution::default_value`](crate::distribution::Distribution::default_value)
/// for the per-kind defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct GuessBackend;

impl Backend for GuessBackend {
    fn name(&self) -> &str {
        "guess"
    }

    fn propose(
        &self,
        space: &ParameterSpace,
        _history: &[RunRecord],
    ) -> Result<Proposal, ProposalError> {
        Ok(space
            .iter()
            .map(|p| (p.name().to_string(), p.fallback_value().clone()))
            .collect())
    }
}
