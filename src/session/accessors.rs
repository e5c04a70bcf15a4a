//! Typed parameter accessors.
//!
//! Each accessor builds a [`Distribution`] and goes through
//! [`Session::param`]; see there for the declaration and lookup rules.

use crate::distribution::{Distribution, IntDistribution};
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::record::type_mismatch;

use super::Session;

impl Session {
    /// An integer in `low..=high`.
    ///
    /// Default without a guess: the midpoint, rounded down.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn randint(
        &mut self,
        name: &str,
        low: i64,
        high: i64,
        guess: impl Into<Option<i64>>,
    ) -> Result<i64> {
        let value = self.param(name, Distribution::int(low, high), guess.into().map(Into::into))?;
        expect_int(name, &value)
    }

    /// An integer from `start..stop` taking every `step`-th value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] if `step` is not positive or
    /// the range is empty; otherwise see [`param`](Self::param).
    pub fn randrange(
        &mut self,
        name: &str,
        start: i64,
        stop: i64,
        step: i64,
        guess: impl Into<Option<i64>>,
    ) -> Result<i64> {
        if step < 1 {
            return Err(Error::invalid(name, "step must be positive"));
        }
        if stop <= start {
            return Err(Error::invalid(
                name,
                format!("empty range {start}..{stop}"),
            ));
        }
        let (start_wide, step_wide) = (i128::from(start), i128::from(step));
        let last = start_wide + (i128::from(stop) - start_wide - 1) / step_wide * step_wide;
        let high = i64::try_from(last).map_err(|_| Error::invalid(name, "range too large"))?;
        let distribution = Distribution::Int(IntDistribution {
            low: start,
            high,
            step,
        });
        let value = self.param(name, distribution, guess.into().map(Into::into))?;
        expect_int(name, &value)
    }

    /// A float in `[low, high]`.
    ///
    /// Default without a guess: the midpoint.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn uniform(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        guess: impl Into<Option<f64>>,
    ) -> Result<f64> {
        let value = self.param(name, Distribution::float(low, high), guess.into().map(Into::into))?;
        expect_float(name, &value)
    }

    /// A float in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn random(&mut self, name: &str, guess: impl Into<Option<f64>>) -> Result<f64> {
        self.uniform(name, 0.0, 1.0, guess)
    }

    /// A positive float in `[low, high]`, sampled uniformly in log space.
    ///
    /// Default without a guess: the geometric mean of the bounds.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn loguniform(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        guess: impl Into<Option<f64>>,
    ) -> Result<f64> {
        let value = self.param(
            name,
            Distribution::log_uniform(low, high),
            guess.into().map(Into::into),
        )?;
        expect_float(name, &value)
    }

    /// A normally distributed float.
    ///
    /// Default without a guess: `mu`.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn normalvariate(
        &mut self,
        name: &str,
        mu: f64,
        sigma: f64,
        guess: impl Into<Option<f64>>,
    ) -> Result<f64> {
        let value = self.param(name, Distribution::normal(mu, sigma), guess.into().map(Into::into))?;
        expect_float(name, &value)
    }

    /// A non-negative integer of `n` random bits.
    ///
    /// Default without a guess: `0`.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn getrandbits(
        &mut self,
        name: &str,
        n: u32,
        guess: impl Into<Option<i64>>,
    ) -> Result<i64> {
        let value = self.param(name, Distribution::bits(n), guess.into().map(Into::into))?;
        expect_int(name, &value)
    }

    /// A boolean.
    ///
    /// Default without a guess: `false`.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    pub fn randbool(&mut self, name: &str, guess: impl Into<Option<bool>>) -> Result<bool> {
        let value = self.param(
            name,
            Distribution::choice([false, true]),
            guess.into().map(Into::into),
        )?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(name, "bool", &value))
    }

    /// One of `choices`.
    ///
    /// Default without a guess: the first choice.
    ///
    /// # Errors
    ///
    /// See [`param`](Self::param).
    ///
    /// # Examples
    ///
    /// ```
    /// use bbopt::prelude::*;
    ///
    /// let mut bb = Session::builder("nets.rs").store(MemoryHistory::new()).build().unwrap();
    /// let activation = bb.choice("activation", ["relu", "tanh"], None).unwrap();
    /// assert_eq!(activation.as_str(), Some("relu"));
    /// ```
    pub fn choice<I, T>(
        &mut self,
        name: &str,
        choices: I,
        guess: impl Into<Option<T>>,
    ) -> Result<ParamValue>
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamValue>,
    {
        self.param(name, Distribution::choice(choices), guess.into().map(Into::into))
    }
}

fn expect_int(name: &str, value: &ParamValue) -> Result<i64> {
    match value {
        ParamValue::Int(v) => Ok(*v),
        other => Err(type_mismatch(name, "int", other)),
    }
}

fn expect_float(name: &str, value: &ParamValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| type_mismatch(name, "float", value))
}
