//! Closed-form optimal subsampling and two-scale tuning parameters.
//!
//! Given a noise variance estimate `var_eps`, an integrated quarticity
//! estimate `IQ`, the horizon `T` and the number of one-second samples:
//!
//! - `K_sub = round(seconds / (T·IQ / (6·var_eps²))^{1/3})`
//! - `K_zma = round(c* · seconds^{2/3})`, `c* = (16·var_eps² / (T·η²))^{1/3}`,
//!   `η² = 4/3 · IQ`
//!
//! Both are clamped to `[1, seconds]`. Degenerate inputs fall back to K = 1,
//! which disables subsampling and the two-scale bias correction.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Why the selector fell back to K = 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KFallback {
    NonPositiveNoiseVariance,
    NonPositiveQuarticity,
    NonPositiveHorizon,
    NoSamples,
    /// Quarticity could not be estimated, fewer than four returns
    TooFewReturns,
    NonFiniteIntermediate,
}

impl fmt::Display for KFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            KFallback::NonPositiveNoiseVariance => "noise variance is zero, negative or too small",
            KFallback::NonPositiveQuarticity => "integrated quarticity is not positive",
            KFallback::NonPositiveHorizon => "horizon is not positive",
            KFallback::NoSamples => "no samples in the period",
            KFallback::TooFewReturns => "fewer than four returns to estimate quarticity",
            KFallback::NonFiniteIntermediate => "optimal-K formula produced a non-finite value",
        };
        f.write_str(reason)
    }
}

/// Pair of tuning parameters, both ≥ 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimalK {
    pub k_sub: usize,
    pub k_zma: usize,
    pub fallback: Option<KFallback>,
}

impl OptimalK {
    pub fn disabled(reason: KFallback) -> Self {
        Self {
            k_sub: 1,
            k_zma: 1,
            fallback: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Select `(K_sub, K_zma)`; never fails, degenerate inputs give `(1, 1)`.
    pub fn select(var_eps: f64, iq: f64, horizon: f64, seconds: usize) -> Self {
        let selected = Self::try_select(var_eps, iq, horizon, seconds);
        if let Some(reason) = selected.fallback {
            warn!(
                var_eps,
                iq,
                horizon,
                seconds,
                "optimal K fallback to 1: {}",
                reason
            );
        } else if selected.zma_is_naive() {
            debug!(
                var_eps,
                iq,
                horizon,
                seconds,
                k_sub = selected.k_sub,
                "K_zma rounds to 1, ZMA reduces to the naive estimator"
            );
        }
        selected
    }

    /// True when `K_zma = 1`, from a fallback or from rounding, so the
    /// two-scale correction is inactive.
    pub fn zma_is_naive(&self) -> bool {
        self.k_zma <= 1
    }

    fn try_select(var_eps: f64, iq: f64, horizon: f64, seconds: usize) -> Self {
        if seconds == 0 {
            return Self::disabled(KFallback::NoSamples);
        }
        let var_sq = var_eps * var_eps;
        if !(var_eps > 0.0 && var_eps.is_finite()) || !(var_sq >= f64::MIN_POSITIVE) {
            return Self::disabled(KFallback::NonPositiveNoiseVariance);
        }
        if !(iq > 0.0 && iq.is_finite()) {
            return Self::disabled(KFallback::NonPositiveQuarticity);
        }
        if !(horizon > 0.0 && horizon.is_finite()) {
            return Self::disabled(KFallback::NonPositiveHorizon);
        }

        let n = seconds as f64;

        // optimal number of sparse observations for the subsampled estimator
        let n_star = (horizon / (6.0 * var_sq) * iq).cbrt();
        let k_sub = n / n_star;

        let eta_sq = 4.0 / 3.0 * iq;
        let c_star = (16.0 * var_sq / (horizon * eta_sq)).cbrt();
        let k_zma = c_star * n.powf(2.0 / 3.0);

        if !(n_star > 0.0 && k_sub.is_finite() && k_zma.is_finite()) {
            return Self::disabled(KFallback::NonFiniteIntermediate);
        }

        Self {
            k_sub: round_k(k_sub, seconds),
            k_zma: round_k(k_zma, seconds),
            fallback: None,
        }
    }
}

fn round_k(raw: f64, seconds: usize) -> usize {
    raw.round().clamp(1.0, seconds as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 1.0 / 252.0;

    #[test]
    fn test_reference_parameters() {
        // θ = 0.04 held constant over one day, noise sd 0.0005
        let var_eps = 0.0005_f64.powi(2);
        let iq = 0.04 * 0.04 * T;
        let k = OptimalK::select(var_eps, iq, T, 23_400);

        assert_eq!(k.k_sub, 576);
        assert_eq!(k.k_zma, 25);
        assert!(!k.is_fallback());
        assert!(!k.zma_is_naive());
    }

    #[test]
    fn test_noise_dominated_quarticity_rounds_zma_to_one() {
        // one-second returns dominated by noise give RQQ ≈ 4n²σ⁴, so
        // K_zma = round(3^{1/3}) without any fallback
        let n = 23_400;
        let var_eps = 0.0005_f64.powi(2);
        let iq = 4.0 * (n as f64).powi(2) * var_eps * var_eps / T;
        let k = OptimalK::select(var_eps, iq, T, n);

        assert!(!k.is_fallback());
        assert_eq!(k.k_zma, 1);
        assert!(k.zma_is_naive());
        assert_eq!(k.k_sub, 33);
    }

    #[test]
    fn test_more_noise_means_larger_k() {
        let iq = 0.04 * 0.04 * T;
        let low = OptimalK::select(1e-8, iq, T, 23_400);
        let high = OptimalK::select(1e-6, iq, T, 23_400);
        assert!(high.k_sub >= low.k_sub);
        assert!(high.k_zma >= low.k_zma);
    }

    #[test]
    fn test_zero_noise_falls_back() {
        let k = OptimalK::select(0.0, 1e-5, T, 23_400);
        assert_eq!(k, OptimalK::disabled(KFallback::NonPositiveNoiseVariance));
        // deterministic: same answer every time
        assert_eq!(k, OptimalK::select(0.0, 1e-5, T, 23_400));
    }

    #[test]
    fn test_tiny_noise_falls_back() {
        // var_eps² underflows
        let k = OptimalK::select(1e-170, 1e-5, T, 23_400);
        assert_eq!(k.fallback, Some(KFallback::NonPositiveNoiseVariance));
        assert_eq!((k.k_sub, k.k_zma), (1, 1));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            OptimalK::select(1e-7, 0.0, T, 23_400).fallback,
            Some(KFallback::NonPositiveQuarticity)
        );
        assert_eq!(
            OptimalK::select(1e-7, f64::NAN, T, 23_400).fallback,
            Some(KFallback::NonPositiveQuarticity)
        );
        assert_eq!(
            OptimalK::select(1e-7, 1e-5, -1.0, 23_400).fallback,
            Some(KFallback::NonPositiveHorizon)
        );
        assert_eq!(
            OptimalK::select(1e-7, 1e-5, T, 0).fallback,
            Some(KFallback::NoSamples)
        );
        assert_eq!(
            OptimalK::select(-1e-7, 1e-5, T, 23_400).fallback,
            Some(KFallback::NonPositiveNoiseVariance)
        );
    }

    #[test]
    fn test_k_clamped_to_sample_count() {
        // enormous noise relative to signal pushes K_sub beyond the sample count
        let k = OptimalK::select(1.0, 1e-30, T, 100);
        assert!(k.k_sub <= 100);
        assert!(k.k_zma <= 100);
        assert!(k.k_sub >= 1 && k.k_zma >= 1);
    }
}
