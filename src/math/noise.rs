//! Synthetic market microstructure noise.
//!
//! Observed log prices are modelled as `Y = X + ε`. The noise is either i.i.d.
//! Gaussian or built from a standardised AR(1) sequence
//! `u[t] = ρ u[t-1] + √(1-ρ²) z[t]` scaled by a per-point standard deviation,
//! which gives heteroskedastic and serially correlated noise.
//!
//! Under a time-varying variance profile `ρ` is the lag-one correlation of the
//! standardised process `u`, not a guaranteed correlation of `ε` itself.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoiseError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Per-point noise variance over the trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarianceProfile {
    Constant {
        variance: f64,
    },
    /// `mean_variance · (1 + amplitude · sin(2π · cycles · t / (N-1)))`
    Sinusoidal {
        mean_variance: f64,
        amplitude: f64,
        cycles: f64,
    },
}

impl VarianceProfile {
    pub fn variance_at(&self, t: usize, n_points: usize) -> f64 {
        match *self {
            VarianceProfile::Constant { variance } => variance,
            VarianceProfile::Sinusoidal {
                mean_variance,
                amplitude,
                cycles,
            } => {
                let phase = if n_points > 1 {
                    t as f64 / (n_points - 1) as f64
                } else {
                    0.0
                };
                mean_variance * (1.0 + amplitude * (2.0 * PI * cycles * phase).sin())
            }
        }
    }

    pub fn validate(&self) -> Result<(), NoiseError> {
        match *self {
            VarianceProfile::Constant { variance } => {
                if !(variance >= 0.0 && variance.is_finite()) {
                    return Err(NoiseError::InvalidParameters(
                        "Noise variance must be non-negative and finite".to_string(),
                    ));
                }
            }
            VarianceProfile::Sinusoidal {
                mean_variance,
                amplitude,
                cycles,
            } => {
                if !(mean_variance >= 0.0 && mean_variance.is_finite()) {
                    return Err(NoiseError::InvalidParameters(
                        "Mean noise variance must be non-negative and finite".to_string(),
                    ));
                }
                if !(0.0..=1.0).contains(&amplitude) {
                    return Err(NoiseError::InvalidParameters(
                        "Amplitude must be in [0, 1] to keep the variance non-negative"
                            .to_string(),
                    ));
                }
                if !cycles.is_finite() {
                    return Err(NoiseError::InvalidParameters(
                        "Number of cycles must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Noise specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseSpec {
    /// ε[t] ~ N(0, sd²) independent across t
    Iid { sd: f64 },
    /// ε[t] = √variance[t] · u[t] with u a standardised AR(1) sequence
    Autoregressive { profile: VarianceProfile, rho: f64 },
}

impl Default for NoiseSpec {
    fn default() -> Self {
        NoiseSpec::Iid { sd: 0.0005 }
    }
}

impl NoiseSpec {
    pub fn validate(&self) -> Result<(), NoiseError> {
        match self {
            NoiseSpec::Iid { sd } => {
                if !(*sd >= 0.0 && sd.is_finite()) {
                    return Err(NoiseError::InvalidParameters(
                        "Noise standard deviation must be non-negative and finite".to_string(),
                    ));
                }
            }
            NoiseSpec::Autoregressive { profile, rho } => {
                profile.validate()?;
                if !(*rho > -1.0 && *rho < 1.0) {
                    return Err(NoiseError::InvalidParameters(
                        "Noise autocorrelation must lie strictly inside (-1, 1)".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn variance_at(&self, t: usize, n_points: usize) -> f64 {
        match self {
            NoiseSpec::Iid { sd } => sd * sd,
            NoiseSpec::Autoregressive { profile, .. } => profile.variance_at(t, n_points),
        }
    }

    /// Average per-point noise variance over a path of `n_points`.
    pub fn mean_variance(&self, n_points: usize) -> f64 {
        match self {
            NoiseSpec::Iid { sd } => sd * sd,
            NoiseSpec::Autoregressive {
                profile: VarianceProfile::Constant { variance },
                ..
            } => *variance,
            NoiseSpec::Autoregressive { profile, .. } => {
                if n_points == 0 {
                    return 0.0;
                }
                (0..n_points)
                    .map(|t| profile.variance_at(t, n_points))
                    .sum::<f64>()
                    / n_points as f64
            }
        }
    }

    /// Draw one noise sequence of length `n_points`.
    pub fn sample<R: Rng + ?Sized>(&self, n_points: usize, rng: &mut R) -> Vec<f64> {
        let mut noise = Vec::with_capacity(n_points);
        match self {
            NoiseSpec::Iid { sd } => {
                for _ in 0..n_points {
                    let z: f64 = StandardNormal.sample(rng);
                    noise.push(sd * z);
                }
            }
            NoiseSpec::Autoregressive { profile, rho } => {
                let innovation_scale = (1.0 - rho * rho).sqrt();
                let mut u = 0.0;
                for t in 0..n_points {
                    let z: f64 = StandardNormal.sample(rng);
                    u = if t == 0 { z } else { rho * u + innovation_scale * z };
                    noise.push(profile.variance_at(t, n_points).sqrt() * u);
                }
            }
        }
        noise
    }

    /// Corrupt a latent log-price path, returning `Y = X + ε`.
    pub fn inject<R: Rng + ?Sized>(
        &self,
        log_price: &[f64],
        rng: &mut R,
    ) -> Result<NoisyObservation, NoiseError> {
        self.validate()?;
        let noise = self.sample(log_price.len(), rng);
        let observed = log_price
            .iter()
            .zip(noise.iter())
            .map(|(x, e)| x + e)
            .collect();
        Ok(NoisyObservation { observed, noise })
    }
}

/// Latent path plus additive noise, same length as the path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoisyObservation {
    pub observed: Vec<f64>,
    pub noise: Vec<f64>,
}

impl NoisyObservation {
    pub fn as_slice(&self) -> &[f64] {
        &self.observed
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}
