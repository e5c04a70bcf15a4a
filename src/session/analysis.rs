use core::cmp::Ordering;

use crate::error::{Error, Result};
use crate::objective::compare_losses;
use crate::record::RunRecord;

use super::Session;

impl Session {
    /// The record of this session's run.
    ///
    /// Before feedback this is the in-progress record: parameter values
    /// known so far and the remembered memory, without an objective. After
    /// feedback it is the record as stored, including its sequence index.
    #[must_use]
    pub fn get_current_run(&self) -> &RunRecord {
        &self.current
    }

    /// Return the best completed run in the script's history.
    ///
    /// Runs are ranked by their loss: the objective under its recorded
    /// direction and comparison, with maximized objectives negated. Among
    /// equal losses the run with the lowest sequence index wins. Runs whose
    /// objective is NaN rank last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] if no run has a completed objective,
    /// or a storage error if history cannot be loaded.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbopt::prelude::*;
    ///
    /// let history = MemoryHistory::new();
    /// let open = |h: &MemoryHistory| Session::builder("opt.rs").store(h.clone()).build().unwrap();
    ///
    /// // Error when no runs completed
    /// assert!(open(&history).get_optimal_run().is_err());
    ///
    /// for loss in [3.0, 1.0, 2.0] {
    ///     open(&history).minimize(loss).unwrap();
    /// }
    ///
    /// let best = open(&history).get_optimal_run().unwrap();
    /// assert_eq!(best.sequence_index, Some(1));
    /// ```
    pub fn get_optimal_run(&self) -> Result<RunRecord> {
        self.top_runs(1)?.into_iter().next().ok_or(Error::EmptyHistory)
    }

    /// Return up to `n` completed runs, best first.
    ///
    /// Uses the same ordering as [`get_optimal_run`](Self::get_optimal_run).
    ///
    /// # Errors
    ///
    /// Returns a storage error if history cannot be loaded.
    pub fn top_runs(&self, n: usize) -> Result<Vec<RunRecord>> {
        let mut ranked: Vec<(Vec<f64>, RunRecord)> = self
            .store
            .load()?
            .into_iter()
            .filter_map(|run| run.loss().map(|loss| (loss, run)))
            .collect();
        ranked.sort_by(|a, b| rank(a, b));
        Ok(ranked.into_iter().take(n).map(|(_, run)| run).collect())
    }

    /// Every recorded run of the script, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if history cannot be loaded.
    pub fn history(&self) -> Result<Vec<RunRecord>> {
        self.store.load()
    }

    /// Number of recorded runs of the script.
    ///
    /// # Errors
    ///
    /// Returns a storage error if history cannot be loaded.
    pub fn n_runs(&self) -> Result<usize> {
        Ok(self.store.load()?.len())
    }
}

/// Lower loss first, then lower sequence index.
fn rank(a: &(Vec<f64>, RunRecord), b: &(Vec<f64>, RunRecord)) -> Ordering {
    compare_losses(&a.0, &b.0).then_with(|| a.1.sequence_index.cmp(&b.1.sequence_index))
}
