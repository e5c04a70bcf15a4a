//! Shared distribution-level utilities used across multiple backends.

use crate::distribution::Distribution;
use crate::param::ParamValue;
use crate::rng_util;

/// Width, in standard deviations, of the box a normal parameter is searched in.
const NORMAL_SPAN: f64 = 3.0;

/// Largest value an `n`-bit parameter can take.
#[allow(clippy::cast_possible_wrap)]
fn bits_max(n: u32) -> i64 {
    ((1_u64 << n) - 1) as i64
}

/// Compute internal-space bounds for a numeric distribution.
///
/// Returns `None` for categorical and custom distributions, which do not
/// take part in surrogate models.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn internal_bounds(distribution: &Distribution) -> Option<(f64, f64)> {
    match distribution {
        Distribution::Int(d) => Some((d.low as f64, d.high as f64)),
        Distribution::Float(d) => Some((d.low, d.high)),
        Distribution::LogUniform(d) => Some((d.low.ln(), d.high.ln())),
        Distribution::Normal(d) => Some((
            d.mu - NORMAL_SPAN * d.sigma,
            d.mu + NORMAL_SPAN * d.sigma,
        )),
        Distribution::Bits(d) => Some((0.0, bits_max(d.n) as f64)),
        Distribution::Choice(_) | Distribution::Custom(_) => None,
    }
}

/// Convert an internal-space value back to a `ParamValue`.
///
/// Returns `None` for distributions without an internal space.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub(crate) fn from_internal(value: f64, distribution: &Distribution) -> Option<ParamValue> {
    match distribution {
        Distribution::Int(d) => {
            // Saturating float-to-int casts keep wide grids in range.
            let k = ((value - d.low as f64) / d.step as f64).round().max(0.0) as u64;
            Some(ParamValue::Int(d.grid_point(k)))
        }
        Distribution::Float(d) => Some(ParamValue::Float(value.clamp(d.low, d.high))),
        Distribution::LogUniform(d) => Some(ParamValue::Float(value.exp().clamp(d.low, d.high))),
        Distribution::Normal(_) => Some(ParamValue::Float(value)),
        Distribution::Bits(d) => Some(ParamValue::Int(
            (value.round() as i64).clamp(0, bits_max(d.n)),
        )),
        Distribution::Choice(_) | Distribution::Custom(_) => None,
    }
}

/// Convert a `ParamValue` to its internal-space representation.
pub(crate) fn to_internal(value: &ParamValue, distribution: &Distribution) -> Option<f64> {
    let v = distribution.coerce(value)?.as_f64()?;
    match distribution {
        Distribution::LogUniform(_) => Some(v.ln()),
        Distribution::Choice(_) | Distribution::Custom(_) => None,
        _ => Some(v),
    }
}

/// Sample a random value for any distribution.
///
/// Custom distributions are opaque to the built-in backends and yield `None`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub(crate) fn sample_random(
    rng: &mut fastrand::Rng,
    distribution: &Distribution,
) -> Option<ParamValue> {
    let value = match distribution {
        Distribution::Int(d) => {
            ParamValue::Int(d.grid_point(rng.u64(0..=d.n_steps())))
        }
        Distribution::Float(d) => {
            ParamValue::Float(rng_util::f64_range(rng, d.low, d.high).clamp(d.low, d.high))
        }
        Distribution::LogUniform(d) => {
            let v = rng_util::f64_range(rng, d.low.ln(), d.high.ln()).exp();
            ParamValue::Float(v.clamp(d.low, d.high))
        }
        Distribution::Normal(d) => ParamValue::Float(rng_util::normal(rng, d.mu, d.sigma)),
        Distribution::Bits(d) => ParamValue::Int((rng.u64(..) >> (64 - d.n)) as i64),
        Distribution::Choice(d) => d.choices[rng.usize(0..d.choices.len())].clone(),
        Distribution::Custom(_) => return None,
    };
    Some(value)
}
