/// Generate a random `f64` in the range `[low, high)`.
///
/// Interpolates between the bounds so that spans wider than `f64::MAX` stay
/// finite.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    let t = rng.f64();
    low * (1.0 - t) + high * t
}

/// Draw from a normal distribution via the Box-Muller transform.
pub(crate) fn normal(rng: &mut fastrand::Rng, mu: f64, sigma: f64) -> f64 {
    // 1 - f64() lies in (0, 1], keeping ln() finite.
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    let z = (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos();
    mu + sigma * z
}
