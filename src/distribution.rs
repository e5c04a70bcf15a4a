//! Parameter distribution types.
//!
//! Every declared parameter carries one [`Distribution`]. The variant fixes
//! the parameter's [`DistributionKind`], which must stay the same across all
//! runs recorded for a script; the variant's fields are the kind-specific
//! arguments.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;

/// Largest supported bit count for [`BitsDistribution`].
pub const MAX_BITS: u32 = 63;

/// Distribution for integer parameters on an inclusive, stepped range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntDistribution {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
    /// Grid spacing starting at `low`.
    pub step: i64,
}

// Grid arithmetic runs in i128: the span of a full i64 range overflows i64.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
impl IntDistribution {
    /// Number of grid steps between `low` and the last grid point.
    pub(crate) fn n_steps(&self) -> u64 {
        ((i128::from(self.high) - i128::from(self.low)) / i128::from(self.step)) as u64
    }

    /// The `k`-th grid point, clamped to the last one.
    pub(crate) fn grid_point(&self, k: u64) -> i64 {
        let k = k.min(self.n_steps());
        (i128::from(self.low) + i128::from(k) * i128::from(self.step)) as i64
    }

    /// Returns `true` if `v` lies on the grid anchored at `low`.
    pub(crate) fn on_grid(&self, v: i64) -> bool {
        (i128::from(v) - i128::from(self.low)) % i128::from(self.step) == 0
    }
}

/// Distribution for floating-point parameters on a closed interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// Distribution for positive floats sampled uniformly in log space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogUniformDistribution {
    /// Lower bound (inclusive, positive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// Normal distribution over all finite floats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalDistribution {
    /// Mean.
    pub mu: f64,
    /// Standard deviation (positive).
    pub sigma: f64,
}

/// Distribution of an integer made of `n` random bits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitsDistribution {
    /// Number of bits, in `1..=63`.
    pub n: u32,
}

/// Distribution over a finite set of categories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDistribution {
    /// The available categories.
    pub choices: Vec<ParamValue>,
}

/// Backend-specific distribution descriptor.
///
/// The core treats `args` as opaque; only the backend that understands
/// `kind` can sample it. Every other backend uses the guess.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomDistribution {
    /// Descriptor name, part of the parameter's shape.
    pub kind: String,
    /// Free-form descriptor arguments.
    pub args: serde_json::Value,
}

/// Enum wrapping all parameter distribution types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// An integer range.
    Int(IntDistribution),
    /// A continuous range.
    Float(FloatDistribution),
    /// A log-uniform continuous range.
    LogUniform(LogUniformDistribution),
    /// A normal distribution.
    Normal(NormalDistribution),
    /// A random bit count.
    Bits(BitsDistribution),
    /// A categorical choice.
    Choice(ChoiceDistribution),
    /// A backend-specific descriptor.
    Custom(CustomDistribution),
}

/// The shape of a distribution, compared across runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DistributionKind {
    /// [`Distribution::Int`].
    Int,
    /// [`Distribution::Float`].
    Float,
    /// [`Distribution::LogUniform`].
    LogUniform,
    /// [`Distribution::Normal`].
    Normal,
    /// [`Distribution::Bits`].
    Bits,
    /// [`Distribution::Choice`].
    Choice,
    /// [`Distribution::Custom`] with its descriptor name.
    Custom(String),
}

impl core::fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int => f.write_str("integer range"),
            Self::Float => f.write_str("continuous range"),
            Self::LogUniform => f.write_str("log-uniform range"),
            Self::Normal => f.write_str("normal"),
            Self::Bits => f.write_str("bit count"),
            Self::Choice => f.write_str("categorical choice"),
            Self::Custom(kind) => write!(f, "custom '{kind}'"),
        }
    }
}

impl Distribution {
    /// Integer range `low..=high` with unit step.
    #[must_use]
    pub fn int(low: i64, high: i64) -> Self {
        Self::Int(IntDistribution { low, high, step: 1 })
    }

    /// Continuous range `[low, high]`.
    #[must_use]
    pub fn float(low: f64, high: f64) -> Self {
        Self::Float(FloatDistribution { low, high })
    }

    /// Log-uniform range `[low, high]`.
    #[must_use]
    pub fn log_uniform(low: f64, high: f64) -> Self {
        Self::LogUniform(LogUniformDistribution { low, high })
    }

    /// Normal distribution with mean `mu` and deviation `sigma`.
    #[must_use]
    pub fn normal(mu: f64, sigma: f64) -> Self {
        Self::Normal(NormalDistribution { mu, sigma })
    }

    /// An `n`-bit random integer.
    #[must_use]
    pub fn bits(n: u32) -> Self {
        Self::Bits(BitsDistribution { n })
    }

    /// A categorical choice among `choices`.
    #[must_use]
    pub fn choice<I, T>(choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamValue>,
    {
        Self::Choice(ChoiceDistribution {
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }

    /// A backend-specific descriptor.
    #[must_use]
    pub fn custom(kind: impl Into<String>, args: serde_json::Value) -> Self {
        Self::Custom(CustomDistribution {
            kind: kind.into(),
            args,
        })
    }

    /// Returns the shape tag of this distribution.
    #[must_use]
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Int(_) => DistributionKind::Int,
            Self::Float(_) => DistributionKind::Float,
            Self::LogUniform(_) => DistributionKind::LogUniform,
            Self::Normal(_) => DistributionKind::Normal,
            Self::Bits(_) => DistributionKind::Bits,
            Self::Choice(_) => DistributionKind::Choice,
            Self::Custom(d) => DistributionKind::Custom(d.kind.clone()),
        }
    }

    /// Checks that the arguments describe a non-empty domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] naming `name` when bounds are
    /// inverted or non-finite, a step or deviation is not positive, a bit
    /// count is out of range, or the choice set is empty.
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            Self::Int(d) => {
                if d.low > d.high {
                    return Err(Error::invalid(
                        name,
                        format!("low ({}) must be <= high ({})", d.low, d.high),
                    ));
                }
                if d.step < 1 {
                    return Err(Error::invalid(name, "step must be positive"));
                }
            }
            Self::Float(FloatDistribution { low, high }) => {
                check_interval(name, *low, *high)?;
            }
            Self::LogUniform(LogUniformDistribution { low, high }) => {
                check_interval(name, *low, *high)?;
                if *low <= 0.0 {
                    return Err(Error::invalid(name, "log-uniform bounds must be positive"));
                }
            }
            Self::Normal(d) => {
                if !d.mu.is_finite() || !d.sigma.is_finite() || d.sigma <= 0.0 {
                    return Err(Error::invalid(
                        name,
                        "mu must be finite and sigma finite and positive",
                    ));
                }
            }
            Self::Bits(d) => {
                if d.n == 0 || d.n > MAX_BITS {
                    return Err(Error::invalid(
                        name,
                        format!("bit count {} outside 1..={MAX_BITS}", d.n),
                    ));
                }
            }
            Self::Choice(d) => {
                if d.choices.is_empty() {
                    return Err(Error::invalid(name, "categorical choices cannot be empty"));
                }
                if !d.choices.iter().all(ParamValue::is_finite) {
                    return Err(Error::invalid(name, "float choices must be finite"));
                }
            }
            Self::Custom(d) => {
                if d.kind.is_empty() {
                    return Err(Error::invalid(name, "custom kind must be named"));
                }
            }
        }
        Ok(())
    }

    /// Returns `value` normalized to this distribution's value type if it
    /// lies in the domain, `None` otherwise.
    ///
    /// Integers are accepted for float-valued kinds and widened.
    #[must_use]
    pub fn coerce(&self, value: &ParamValue) -> Option<ParamValue> {
        match self {
            Self::Int(d) => {
                let v = value.as_i64()?;
                (d.low <= v && v <= d.high && d.on_grid(v)).then_some(ParamValue::Int(v))
            }
            Self::Float(FloatDistribution { low, high })
            | Self::LogUniform(LogUniformDistribution { low, high }) => {
                let v = value.as_f64()?;
                (*low <= v && v <= *high).then_some(ParamValue::Float(v))
            }
            Self::Normal(_) => {
                let v = value.as_f64()?;
                v.is_finite().then_some(ParamValue::Float(v))
            }
            Self::Bits(d) => {
                let v = value.as_i64()?;
                (v >= 0 && v >> d.n == 0).then_some(ParamValue::Int(v))
            }
            Self::Choice(d) => d.choices.contains(value).then(|| value.clone()),
            Self::Custom(_) => value.is_finite().then(|| value.clone()),
        }
    }

    /// Returns `true` if `value` lies in the domain.
    #[must_use]
    pub fn contains(&self, value: &ParamValue) -> bool {
        self.coerce(value).is_some()
    }

    /// The value used when a parameter has no guess.
    ///
    /// | Kind | Default |
    /// |------|---------|
    /// | integer range | grid point nearest the midpoint, rounding down |
    /// | continuous range | midpoint |
    /// | log-uniform range | geometric mean of the bounds |
    /// | normal | the mean |
    /// | bit count | `0` |
    /// | categorical choice | the first choice |
    /// | custom | none; a guess is required |
    #[must_use]
    pub fn default_value(&self) -> Option<ParamValue> {
        match self {
            Self::Int(d) => Some(ParamValue::Int(d.grid_point(d.n_steps() / 2))),
            Self::Float(d) => Some(ParamValue::Float(f64::midpoint(d.low, d.high))),
            Self::LogUniform(d) => Some(ParamValue::Float(
                f64::midpoint(d.low.ln(), d.high.ln()).exp().clamp(d.low, d.high),
            )),
            Self::Normal(d) => Some(ParamValue::Float(d.mu)),
            Self::Bits(_) => Some(ParamValue::Int(0)),
            Self::Choice(d) => d.choices.first().cloned(),
            Self::Custom(_) => None,
        }
    }
}

fn check_interval(name: &str, low: f64, high: f64) -> Result<()> {
    if !low.is_finite() || !high.is_finite() {
        return Err(Error::invalid(name, "bounds must be finite"));
    }
    if low > high {
        return Err(Error::invalid(
            name,
            format!("low ({low}) must be <= high ({high})"),
        ));
    }
    Ok(())
}
