//! Declared parameters and the per-run parameter space.
//!
//! A [`Parameter`] is validated when it is built: its distribution must
//! describe a non-empty domain and its guess, if any, must lie inside it.
//! The [`ParameterSpace`] keeps parameters in declaration order and checks
//! them against the shapes recorded in a script's history.
//!
//! # Example
//!
//! ```
//! use bbopt::distribution::Distribution;
//! use bbopt::parameter::{Parameter, ParameterSpace};
//!
//! let mut space = ParameterSpace::new();
//! space
//!     .declare(Parameter::new("x0", Distribution::int(1, 10), Some(5.into())).unwrap())
//!     .unwrap();
//! space
//!     .declare(Parameter::new("x1", Distribution::float(0.0, 1.0), None).unwrap())
//!     .unwrap();
//!
//! assert_eq!(space.names().collect::<Vec<_>>(), ["x0", "x1"]);
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::distribution::{Distribution, DistributionKind};
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::record::RunRecord;

/// A single named tunable value.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    distribution: Distribution,
    guess: Option<ParamValue>,
    /// Guess if present, otherwise the domain default.
    fallback: ParamValue,
}

impl Parameter {
    /// Builds a parameter, validating the distribution and the guess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] if the distribution arguments
    /// are malformed, the guess lies outside the domain, or a custom
    /// distribution is declared without a guess.
    pub fn new(
        name: impl Into<String>,
        distribution: Distribution,
        guess: Option<ParamValue>,
    ) -> Result<Self> {
        let name = name.into();
        distribution.validate(&name)?;

        let guess = match guess {
            Some(g) => Some(distribution.coerce(&g).ok_or_else(|| {
                Error::invalid(&name, format!("guess {g} lies outside the domain"))
            })?),
            None => None,
        };

        let fallback = guess
            .clone()
            .or_else(|| {
                distribution
                    .default_value()
                    .and_then(|v| distribution.coerce(&v))
            })
            .ok_or_else(|| Error::invalid(&name, "no domain default; a guess is required"))?;

        Ok(Self {
            name,
            distribution,
            guess,
            fallback,
        })
    }

    /// Rebuilds a parameter seen only in history.
    ///
    /// Custom distributions have no domain default, so the most recently
    /// recorded value stands in for the guess.
    pub(crate) fn adopted(
        name: &str,
        distribution: &Distribution,
        recorded: Option<&ParamValue>,
    ) -> Result<Self> {
        let guess = match distribution {
            Distribution::Custom(_) => recorded.cloned(),
            _ => None,
        };
        Self::new(name, distribution.clone(), guess)
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared distribution.
    #[must_use]
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// The declared guess, if any.
    #[must_use]
    pub fn guess(&self) -> Option<&ParamValue> {
        self.guess.as_ref()
    }

    /// The shape tag of the distribution.
    #[must_use]
    pub fn kind(&self) -> DistributionKind {
        self.distribution.kind()
    }

    /// The value used when no backend proposes one: the guess, or else the
    /// domain default.
    #[must_use]
    pub fn fallback_value(&self) -> &ParamValue {
        &self.fallback
    }
}

/// The parameters declared during one run, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ParameterSpace {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if the name is already declared.
    pub fn declare(&mut self, param: Parameter) -> Result<&Parameter> {
        if self.index.contains_key(&param.name) {
            return Err(Error::DuplicateParameter { name: param.name });
        }
        let position = self.params.len();
        self.index.insert(param.name.clone(), position);
        self.params.push(param);
        Ok(&self.params[position])
    }

    /// Swaps in a new definition for an already registered name.
    pub(crate) fn replace(&mut self, param: Parameter) -> Result<()> {
        let position = *self
            .index
            .get(&param.name)
            .ok_or(Error::Internal("replacing an undeclared parameter"))?;
        self.params[position] = param;
        Ok(())
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    /// Returns `true` if `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates over the parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Iterates over the parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Parameter::name)
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Registers every parameter recorded in `history` that is not declared
    /// yet, using its recorded distribution. Returns the adopted names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] if a recorded distribution is
    /// itself invalid, which only happens for hand-edited history files.
    pub fn adopt_from(&mut self, history: &[RunRecord]) -> Result<Vec<String>> {
        let mut adopted = Vec::new();
        // Newest first, so a custom parameter inherits its latest value.
        for record in history.iter().rev() {
            for (name, distribution) in &record.distributions {
                if self.contains(name) {
                    continue;
                }
                let param = Parameter::adopted(name, distribution, record.values.get(name))?;
                self.declare(param)?;
                adopted.push(name.clone());
            }
        }
        Ok(adopted)
    }

    /// Checks that this space has the same parameter names and kinds as
    /// every run in `history`.
    ///
    /// An empty history accepts any space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterShapeMismatch`] naming the first parameter
    /// whose kind differs, that is missing from a recorded run, or that is
    /// recorded but not declared.
    pub fn validate_against(&self, history: &[RunRecord]) -> Result<()> {
        for record in history {
            for param in &self.params {
                let Some(recorded) = record.distributions.get(&param.name) else {
                    return Err(Error::ParameterShapeMismatch {
                        name: param.name.clone(),
                        reason: format!(
                            "not present in recorded run {}",
                            describe_index(record)
                        ),
                    });
                };
                let (expected, found) = (recorded.kind(), param.kind());
                if expected != found {
                    return Err(Error::kind_mismatch(&param.name, &expected, &found));
                }
            }

            let recorded: BTreeSet<&String> = record.distributions.keys().collect();
            if let Some(missing) = recorded.into_iter().find(|name| !self.contains(name)) {
                return Err(Error::ParameterShapeMismatch {
                    name: missing.clone(),
                    reason: "recorded in history but not declared".into(),
                });
            }
        }
        Ok(())
    }
}

fn describe_index(record: &RunRecord) -> String {
    record
        .sequence_index
        .map_or_else(|| "(unindexed)".to_string(), |i| format!("#{i}"))
}
