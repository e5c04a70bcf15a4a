//! Run records: one trial's values, memory, and outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::objective::{Comparison, Objective};
use crate::param::ParamValue;
use crate::types::Direction;

/// The record of a single run of an experiment script.
///
/// A record is filled in while the run progresses and becomes immutable once
/// it has been appended to a [`HistoryStore`](crate::storage::HistoryStore),
/// at which point it receives its `sequence_index`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Position in the history, assigned at append time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<u64>,
    /// The concrete value used for every parameter.
    pub values: BTreeMap<String, ParamValue>,
    /// The distribution each parameter was declared with.
    pub distributions: BTreeMap<String, Distribution>,
    /// Free-form auxiliary values reported by the script.
    #[serde(default)]
    pub memory: BTreeMap<String, serde_json::Value>,
    /// The reported outcome, absent until feedback is given.
    #[serde(default)]
    pub objective: Option<Objective>,
    /// Whether the objective was minimized or maximized.
    #[serde(default)]
    pub direction: Option<Direction>,
    /// How objective tuples of this run are ranked.
    #[serde(default)]
    pub comparison: Comparison,
    /// The backend that proposed the values; `None` for guess-only runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl RunRecord {
    /// Returns `true` once an objective and direction are recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.objective.is_some() && self.direction.is_some()
    }

    /// The ranking loss of this run, lower is better.
    ///
    /// Returns `None` for runs without an objective.
    #[must_use]
    pub fn loss(&self) -> Option<Vec<f64>> {
        let objective = self.objective.as_ref()?;
        let direction = self.direction?;
        Some(objective.loss(direction, &self.comparison))
    }

    /// The value recorded for the named parameter.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// The integer value of the named parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterShapeMismatch`] if the parameter is absent
    /// and [`Error::TypeMismatch`] if it is not an integer.
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.require(name)?;
        value.as_i64().ok_or_else(|| type_mismatch(name, "int", value))
    }

    /// The float value of the named parameter; integers are widened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterShapeMismatch`] if the parameter is absent
    /// and [`Error::TypeMismatch`] if it is not numeric.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self.require(name)?;
        value.as_f64().ok_or_else(|| type_mismatch(name, "float", value))
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| Error::ParameterShapeMismatch {
                name: name.to_string(),
                reason: "not recorded in this run".into(),
            })
    }
}

pub(crate) fn type_mismatch(name: &str, expected: &'static str, found: &ParamValue) -> Error {
    Error::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}
