//! Nonparametric noise-variance and quarticity estimators.

use std::f64::consts::PI;

/// First differences of a log-price path.
pub fn log_returns(log_price: &[f64]) -> Vec<f64> {
    log_price.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Noise variance implied by a noise-dominated full-frequency RV: `RV / (2n)`.
pub fn noise_variance_estimate(full_rv: f64, n_increments: usize) -> Option<f64> {
    if n_increments == 0 {
        return None;
    }
    Some(full_rv / (2.0 * n_increments as f64))
}

/// Realized quadpower quarticity
/// `(n·π²/4) · Σ_{i=4}^{n} |r_i|·|r_{i-1}|·|r_{i-2}|·|r_{i-3}|`.
///
/// Returns `None` for fewer than four returns.
pub fn realized_quadpower_quarticity(returns: &[f64]) -> Option<f64> {
    let n = returns.len();
    if n < 4 {
        return None;
    }

    let sum: f64 = returns
        .windows(4)
        .map(|w| w[0].abs() * w[1].abs() * w[2].abs() * w[3].abs())
        .sum();

    Some(n as f64 * PI * PI / 4.0 * sum)
}

/// Bipower variation `(π/2) · Σ |r_i|·|r_{i-1}|`, robust to finite-activity jumps.
pub fn bipower_variation(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let sum: f64 = returns.windows(2).map(|w| w[0].abs() * w[1].abs()).sum();
    Some(PI / 2.0 * sum)
}
