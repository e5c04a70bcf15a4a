//! Gaussian Process (GP) backend with Expected Improvement acquisition.
//!
//! A model-based backend that fits a Gaussian Process surrogate with a
//! **Matérn 5/2 kernel** (with ARD lengthscales) to the completed runs in the
//! history and proposes the point that maximizes the **Expected
//! Improvement (EI)** acquisition function.
//!
//! # Algorithm overview
//!
//! 1. **Startup phase**: while fewer than `n_startup_trials` completed runs
//!    exist, proposals are sampled uniformly at random.
//! 2. **Fit GP**: each run's loss (the first entry of its ranking loss, so
//!    maximized objectives are negated) is standardized and a GP is fitted via
//!    Cholesky decomposition. ARD lengthscales are set to the per-dimension
//!    standard deviation of the training inputs.
//! 3. **Maximize EI**: up to `n_candidates` random points are scored under
//!    the GP posterior, stopping early once `time_budget` is spent, and the
//!    point with the highest EI is proposed.
//!
//! Only numeric parameters (integer, continuous, log-uniform, normal, bit
//! count) enter the model; categorical parameters are sampled at random and
//! custom ones are left to their guess. At most 100 of the most recent runs
//! are used for fitting, keeping the O(n³) cost bounded.
//!
//! # Failing soft
//!
//! The backend never returns an error. Too little history, a space without
//! numeric parameters, or a failed factorization all produce a random
//! proposal instead.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `n_startup_trials` | 5 | Completed runs required before the GP is used |
//! | `n_candidates` | 1000 | Random candidates scored for EI |
//! | `noise_variance` | 1e-6 | Observation noise added to kernel diagonal |
//! | `time_budget_ms` | 1000 | Wall-clock limit for candidate scoring |
//! | `seed` | random | RNG seed for reproducibility |
//!
//! # Examples
//!
//! ```
//! use bbopt::backend::GpBackend;
//!
//! let backend = GpBackend::builder()
//!     .n_startup_trials(3)
//!     .n_candidates(500)
//!     .seed(42)
//!     .build();
//! ```

use std::time::{Duration, Instant};

use nalgebra::DMatrix;
use parking_lot::Mutex;

use crate::backend::common::{from_internal, internal_bounds, sample_random, to_internal};
use crate::backend::{Backend, BackendConfig, Proposal};
use crate::error::ProposalError;
use crate::parameter::{Parameter, ParameterSpace};
use crate::record::RunRecord;
use crate::rng_util;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Gaussian Process backend for Bayesian optimization.
///
/// # Examples
///
/// ```
/// use bbopt::backend::GpBackend;
///
/// // Default configuration
/// let backend = GpBackend::new();
///
/// // With seed for reproducibility
/// let backend = GpBackend::with_seed(42);
/// ```
pub struct GpBackend {
    n_startup_trials: usize,
    n_candidates: usize,
    noise_variance: f64,
    time_budget: Duration,
    rng: Mutex<fastrand::Rng>,
}

impl GpBackend {
    /// Creates a new GP backend with a random seed.
    #[must_use]
    pub fn new() -> Self {
        GpBackendBuilder::new().build()
    }

    /// Creates a new GP backend with a fixed seed for reproducibility.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        GpBackendBuilder::new().seed(seed).build()
    }

    /// Creates a builder for configuring a `GpBackend`.
    #[must_use]
    pub fn builder() -> GpBackendBuilder {
        GpBackendBuilder::new()
    }

    /// Builds a backend from pass-through `run` configuration.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut builder = GpBackendBuilder::new();
        builder.n_startup_trials = config.usize("n_startup_trials");
        builder.n_candidates = config.usize("n_candidates");
        builder.noise_variance = config.f64("noise_variance");
        builder.time_budget = config.u64("time_budget_ms").map(Duration::from_millis);
        builder.seed = config.u64("seed");
        builder.build()
    }
}

impl Default for GpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`GpBackend`].
///
/// All options have sensible defaults:
/// - `n_startup_trials`: 5
/// - `n_candidates`: 1000
/// - `noise_variance`: 1e-6
/// - `time_budget`: 1 second
/// - `seed`: random
#[derive(Debug, Clone, Default)]
pub struct GpBackendBuilder {
    n_startup_trials: Option<usize>,
    n_candidates: Option<usize>,
    noise_variance: Option<f64>,
    time_budget: Option<Duration>,
    seed: Option<u64>,
}

impl GpBackendBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of completed runs required before the GP is used.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = Some(n);
        self
    }

    /// Sets the number of random candidate points scored for EI.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = Some(n);
        self
    }

    /// Sets the observation noise variance added to the kernel diagonal.
    ///
    /// Larger values make the GP smoother.
    #[must_use]
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = Some(v);
        self
    }

    /// Sets the wall-clock limit for scoring candidates.
    #[must_use]
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configured [`GpBackend`].
    #[must_use]
    pub fn build(self) -> GpBackend {
        let rng = self
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        GpBackend {
            n_startup_trials: self.n_startup_trials.unwrap_or(DEFAULT_N_STARTUP),
            n_candidates: self.n_candidates.unwrap_or(DEFAULT_N_CANDIDATES).max(1),
            noise_variance: self.noise_variance.unwrap_or(DEFAULT_NOISE_VAR),
            time_budget: self.time_budget.unwrap_or(DEFAULT_TIME_BUDGET),
            rng: Mutex::new(rng),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal types
// ---------------------------------------------------------------------------

/// Default number of completed runs before the GP kicks in.
const DEFAULT_N_STARTUP: usize = 5;
/// Default number of candidate points for EI optimization.
const DEFAULT_N_CANDIDATES: usize = 1000;
/// Default observation noise variance.
const DEFAULT_NOISE_VAR: f64 = 1e-6;
/// Default wall-clock limit for acquisition.
const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(1);

/// A numeric parameter and its internal-space bounds.
struct Dimension<'a> {
    param: &'a Parameter,
    lo: f64,
    hi: f64,
}

/// A fitted GP model ready for predictions.
struct GpModel {
    /// Cholesky factor L of K + σ²I.
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    /// α = (K + σ²I)^{-1} y.
    alpha: nalgebra::DVector<f64>,
    /// Training inputs (each row is a data point, normalized to [0, 1]).
    x_train: Vec<Vec<f64>>,
    /// ARD lengthscales per dimension.
    lengthscales: Vec<f64>,
    /// Signal variance.
    signal_var: f64,
    /// Best observed (standardized) y.
    f_best: f64,
}

// ---------------------------------------------------------------------------
// Matérn 5/2 kernel
// ---------------------------------------------------------------------------

/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn 5/2 kernel with ARD lengthscales.
///
/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
fn matern52(x1: &[f64], x2: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
    let r_sq: f64 = x1
        .iter()
        .zip(x2)
        .zip(lengthscales)
        .map(|((a, b), l)| ((a - b) / l).powi(2))
        .sum();
    let r = r_sq.sqrt();
    let sqrt5_r = SQRT_5 * r;
    signal_var * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

/// Build the kernel matrix `K + σ²I`.
fn kernel_matrix(
    x: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
    noise_var: f64,
) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = matern52(&x[i], &x[j], lengthscales, signal_var);
        if i == j { k + noise_var } else { k }
    })
}

/// Compute the kernel vector k(x*, X) for a test point.
fn kernel_vector(
    x_star: &[f64],
    x_train: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
) -> nalgebra::DVector<f64> {
    nalgebra::DVector::from_fn(x_train.len(), |i, _| {
        matern52(x_star, &x_train[i], lengthscales, signal_var)
    })
}

// ---------------------------------------------------------------------------
// GP fitting and prediction
// ---------------------------------------------------------------------------

/// Fit a GP model to the training data.
///
/// Returns `None` if fitting fails (no data, non-finite targets, or a
/// Cholesky decomposition failure).
#[allow(clippy::cast_precision_loss)]
fn fit_gp(x_train: &[Vec<f64>], y_train: &[f64], noise_var: f64) -> Option<GpModel> {
    let n = y_train.len();
    if n == 0 || y_train.iter().any(|y| !y.is_finite()) {
        return None;
    }

    // Standardize y
    let y_mean = y_train.iter().sum::<f64>() / n as f64;
    let y_var = if n > 1 {
        y_train.iter().map(|&y| (y - y_mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        1.0
    };
    let y_std = y_var.sqrt().max(1e-10);
    let y_standardized: Vec<f64> = y_train.iter().map(|&y| (y - y_mean) / y_std).collect();

    let f_best = y_standardized.iter().copied().fold(f64::INFINITY, f64::min);

    // ARD lengthscales: per-dimension std dev of training X, clamped
    let d = x_train.first().map_or(0, Vec::len);
    let lengthscales: Vec<f64> = (0..d)
        .map(|j| {
            let mean_j = x_train.iter().map(|x| x[j]).sum::<f64>() / n as f64;
            let var_j = x_train.iter().map(|x| (x[j] - mean_j).powi(2)).sum::<f64>() / n as f64;
            var_j.sqrt().max(0.01)
        })
        .collect();

    // Signal variance = 1.0 (data is standardized)
    let signal_var = 1.0;

    let k = kernel_matrix(x_train, &lengthscales, signal_var, noise_var);
    let cholesky = nalgebra::linalg::Cholesky::new(k)?;

    // α = (K + σ²I)^{-1} y
    let y_vec = nalgebra::DVector::from_column_slice(&y_standardized);
    let alpha = cholesky.solve(&y_vec);

    Some(GpModel {
        cholesky,
        alpha,
        x_train: x_train.to_vec(),
        lengthscales,
        signal_var,
        f_best,
    })
}

/// Predict mean and standard deviation at a test point.
fn predict(model: &GpModel, x: &[f64]) -> (f64, f64) {
    let k_star = kernel_vector(x, &model.x_train, &model.lengthscales, model.signal_var);

    // Mean: k*^T α
    let mean = k_star.dot(&model.alpha);

    // Variance: k(x*, x*) - k*^T (K + σ²I)^{-1} k*
    let v = model.cholesky.solve(&k_star);
    let var = (model.signal_var - k_star.dot(&v)).max(0.0);

    (mean, var.sqrt())
}

// ---------------------------------------------------------------------------
// Normal distribution helpers
// ---------------------------------------------------------------------------

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart rational approximation).
fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

/// Compute Expected Improvement at a point.
///
/// `EI(x) = (f_best - mean) Φ(z) + std φ(z)`
/// where `z = (f_best - mean) / std`
fn expected_improvement(mean: f64, std: f64, f_best: f64) -> f64 {
    if std < 1e-12 {
        return (f_best - mean).max(0.0);
    }
    let z = (f_best - mean) / std;
    let improvement = (f_best - mean) * norm_cdf(z) + std * norm_pdf(z);
    improvement.max(0.0)
}

// ---------------------------------------------------------------------------
// Acquisition optimization
// ---------------------------------------------------------------------------

/// Find the point in [0, 1]^d that maximizes EI by random search.
///
/// Always scores at least one candidate; stops at `n_candidates` or once
/// `budget` has elapsed.
fn optimize_acquisition(
    model: &GpModel,
    n_dims: usize,
    n_candidates: usize,
    budget: Duration,
    rng: &mut fastrand::Rng,
) -> Vec<f64> {
    let started = Instant::now();
    let mut best_ei = f64::NEG_INFINITY;
    let mut best_x = vec![0.5; n_dims];

    for scored in 0..n_candidates {
        if scored > 0 && started.elapsed() >= budget {
            trace_debug!(scored, "acquisition time budget exhausted");
            break;
        }
        let x: Vec<f64> = (0..n_dims)
            .map(|_| rng_util::f64_range(rng, 0.0, 1.0))
            .collect();
        let (mean, std) = predict(model, &x);
        let ei = expected_improvement(mean, std, model.f_best);
        if ei > best_ei {
            best_ei = ei;
            best_x = x;
        }
    }

    best_x
}

// ---------------------------------------------------------------------------
// Training data
// ---------------------------------------------------------------------------

/// Maximum number of training points to use for the GP.
/// Caps computational cost at O(`MAX_TRAIN_POINTS`^3) per proposal.
const MAX_TRAIN_POINTS: usize = 100;

/// Convert an internal-space value to normalized [0, 1] using bounds.
fn to_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    // Halved operands keep the span finite for bounds near `f64::MAX`.
    let span = hi / 2.0 - lo / 2.0;
    if span.abs() < 1e-15 {
        0.5
    } else {
        ((value / 2.0 - lo / 2.0) / span).clamp(0.0, 1.0)
    }
}

/// Build normalized training data from completed runs.
///
/// Runs with a non-finite loss, missing a numeric dimension, or holding a
/// value outside its current domain, are skipped.
fn build_training_data(
    history: &[RunRecord],
    dimensions: &[Dimension<'_>],
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let usable: Vec<(&RunRecord, f64)> = history
        .iter()
        .filter_map(|run| {
            let loss = run.loss()?;
            loss.first().copied().filter(|y| y.is_finite()).map(|y| (run, y))
        })
        .collect();
    let start = usable.len().saturating_sub(MAX_TRAIN_POINTS);

    let mut x_train = Vec::with_capacity(usable.len() - start);
    let mut y_train = Vec::with_capacity(usable.len() - start);

    for &(run, y) in &usable[start..] {
        let row: Option<Vec<f64>> = dimensions
            .iter()
            .map(|dim| {
                let value = run.values.get(dim.param.name())?;
                let internal = to_internal(value, dim.param.distribution())?;
                Some(to_normalized(internal, dim.lo, dim.hi))
            })
            .collect();
        if let Some(row) = row {
            x_train.push(row);
            y_train.push(y);
        }
    }

    (x_train, y_train)
}

// ---------------------------------------------------------------------------
// Backend trait implementation
// ---------------------------------------------------------------------------

impl Backend for GpBackend {
    fn name(&self) -> &str {
        "gp"
    }

    fn propose(
        &self,
        space: &ParameterSpace,
        history: &[RunRecord],
    ) -> Result<Proposal, ProposalError> {
        let mut rng = self.rng.lock();

        let dimensions: Vec<Dimension<'_>> = space
            .iter()
            .filter_map(|param| {
                internal_bounds(param.distribution()).map(|(lo, hi)| Dimension { param, lo, hi })
            })
            .collect();

        let model = if dimensions.is_empty() {
            trace_debug!("no numeric parameters; sampling at random");
            None
        } else {
            let (x_train, y_train) = build_training_data(history, &dimensions);
            if y_train.len() < self.n_startup_trials.max(1) {
                trace_debug!(
                    completed = y_train.len(),
                    required = self.n_startup_trials,
                    "startup phase; sampling at random"
                );
                None
            } else {
                let fitted = fit_gp(&x_train, &y_train, self.noise_variance);
                if fitted.is_none() {
                    trace_warn!("GP fit failed; sampling at random");
                }
                fitted
            }
        };

        let mut proposal = Proposal::new();
        if let Some(model) = model {
            let candidate = optimize_acquisition(
                &model,
                dimensions.len(),
                self.n_candidates,
                self.time_budget,
                &mut rng,
            );
            for (dim, &x) in dimensions.iter().zip(&candidate) {
                let internal = dim.lo * (1.0 - x) + dim.hi * x;
                if let Some(value) = from_internal(internal, dim.param.distribution()) {
                    proposal.insert(dim.param.name().to_string(), value);
                }
            }
        }

        for param in space.iter() {
            if proposal.contains_key(param.name()) {
                continue;
            }
            if let Some(value) = sample_random(&mut rng, param.distribution()) {
                proposal.insert(param.name().to_string(), value);
            }
        }

        Ok(proposal)
    }
}
