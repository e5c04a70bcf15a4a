//! Objective values and how runs are ranked by them.
//!
//! A run reports either one number or an ordered tuple of numbers. Tuples
//! are ranked according to a [`Comparison`] chosen at feedback time: either
//! lexicographically, in the order the values were reported, or by a
//! weighted sum.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Direction;

/// The outcome reported by one run.
///
/// Non-finite values are kept: a diverged run reporting NaN is recorded and
/// ranks after every finite run. In JSON they are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// A single objective value.
    Scalar(#[serde(with = "non_finite")] f64),
    /// An ordered tuple of objective values, highest priority first.
    Vector(#[serde(with = "non_finite::seq")] Vec<f64>),
}

impl Objective {
    /// The reported values as a slice.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => core::slice::from_ref(v),
            Self::Vector(v) => v,
        }
    }

    /// Reduces the objective to a single number, if it is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Vector(_) => None,
        }
    }

    /// Checks that the objective can be ranked under `comparison`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObjective`] for an empty tuple, or when a
    /// weighted comparison has a different number of weights than values or
    /// a non-finite weight.
    pub fn validate(&self, comparison: &Comparison) -> Result<()> {
        if let Self::Vector(values) = self {
            if values.is_empty() {
                return Err(Error::InvalidObjective(
                    "objective tuple cannot be empty".into(),
                ));
            }
            if let Comparison::Weighted(weights) = comparison {
                if weights.len() != values.len() {
                    return Err(Error::InvalidObjective(format!(
                        "{} weights given for {} objective values",
                        weights.len(),
                        values.len()
                    )));
                }
                if !weights.iter().all(|w| w.is_finite()) {
                    return Err(Error::InvalidObjective("weights must be finite".into()));
                }
            }
        }
        Ok(())
    }

    /// The loss vector used for ranking: lower is better.
    ///
    /// Maximized objectives are negated so that runs recorded with
    /// different directions still share one ordering.
    #[must_use]
    pub fn loss(&self, direction: Direction, comparison: &Comparison) -> Vec<f64> {
        let raw = match (self, comparison) {
            (Self::Scalar(v), _) => vec![*v],
            (Self::Vector(values), Comparison::Lexicographic) => values.clone(),
            (Self::Vector(values), Comparison::Weighted(weights)) => {
                vec![values.iter().zip(weights).map(|(v, w)| v * w).sum()]
            }
        };
        match direction {
            Direction::Minimize => raw,
            Direction::Maximize => raw.into_iter().map(|v| -v).collect(),
        }
    }
}

impl From<f64> for Objective {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for Objective {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl<const N: usize> From<[f64; N]> for Objective {
    fn from(v: [f64; N]) -> Self {
        Self::Vector(v.to_vec())
    }
}

/// Serde adapter for objective values that JSON numbers cannot hold.
mod non_finite {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    fn encode(v: f64) -> Repr {
        if v.is_finite() {
            Repr::Number(v)
        } else if v.is_nan() {
            Repr::Text("NaN".into())
        } else if v > 0.0 {
            Repr::Text("inf".into())
        } else {
            Repr::Text("-inf".into())
        }
    }

    fn decode<E: de::Error>(repr: Repr) -> Result<f64, E> {
        match repr {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(E::custom(format!("invalid objective value {other:?}"))),
            },
        }
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        encode(*v).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        decode(Repr::deserialize(deserializer)?)
    }

    pub(super) mod seq {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{Repr, decode, encode};

        pub(in crate::objective) fn serialize<S: Serializer>(
            values: &[f64],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|&v| encode(v)))
        }

        pub(in crate::objective) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<f64>, D::Error> {
            Vec::<Repr>::deserialize(deserializer)?
                .into_iter()
                .map(decode::<D::Error>)
                .collect()
        }
    }
}

/// How objective tuples are ranked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Compare element by element, first value first.
    #[default]
    Lexicographic,
    /// Compare the weighted sum of the values.
    Weighted(Vec<f64>),
}

/// Orders two loss vectors, NaN entries ranking after every number.
pub(crate) fn compare_losses(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
