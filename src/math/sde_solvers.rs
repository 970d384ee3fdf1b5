//! Stochastic Differential Equation Solvers
//!
//! This module implements the latent price simulator used by the Monte Carlo
//! studies: an Euler-Maruyama discretisation of the Heston stochastic
//! volatility model, optionally extended with Merton-style lognormal jumps
//! (the Heston-Bates variant).
//!
//! Features:
//! - Full truncation scheme keeping the variance process at or above zero
//! - Price and variance shocks correlated through a Cholesky factor
//! - Compound Poisson jumps with lognormal multipliers
//! - Ground-truth integrated variance, quarticity and jump variation per path
use nalgebra::{Matrix2, Vector2};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, StandardNormal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trading seconds in a 6.5 hour session.
pub const SECONDS_PER_TRADING_DAY: usize = 23_400;

/// Trading days per year, used for the default one-day horizon.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Error, Debug)]
pub enum SDEError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Simulation error: {0}")]
    SimulationError(String),
}

/// SDE solver trait for different numerical schemes
pub trait SDESolver {
    type State: Clone;

    /// Solve one time step
    fn solve_step<R: Rng + ?Sized>(
        &self,
        dt: f64,
        state: &Self::State,
        rng: &mut R,
    ) -> Result<Self::State, SDEError>;

    /// Solve entire path, returning `n_steps + 1` states including the initial one
    fn solve_path<R: Rng + ?Sized>(
        &self,
        initial: Self::State,
        dt: f64,
        n_steps: usize,
        rng: &mut R,
    ) -> Result<Vec<Self::State>, SDEError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SDEError::InvalidParameters(format!(
                "Time step must be positive and finite, got {}",
                dt
            )));
        }

        let mut path = Vec::with_capacity(n_steps + 1);
        let mut current_state = initial;

        path.push(current_state.clone());

        for _ in 0..n_steps {
            current_state = self.solve_step(dt, &current_state, rng)?;
            path.push(current_state.clone());
        }

        Ok(path)
    }
}

/// Discretisation of one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingGrid {
    /// Number of one-second steps in the day
    pub seconds_per_day: usize,
    /// Length of the day in model time units (years by default)
    pub horizon: f64,
}

impl Default for SamplingGrid {
    fn default() -> Self {
        Self {
            seconds_per_day: SECONDS_PER_TRADING_DAY,
            horizon: 1.0 / TRADING_DAYS_PER_YEAR,
        }
    }
}

impl SamplingGrid {
    pub fn dt(&self) -> f64 {
        self.horizon / self.seconds_per_day as f64
    }

    pub fn n_points(&self) -> usize {
        self.seconds_per_day + 1
    }

    pub fn validate(&self) -> Result<(), SDEError> {
        if self.seconds_per_day == 0 {
            return Err(SDEError::InvalidParameters(
                "Grid must contain at least one step".to_string(),
            ));
        }
        if !(self.horizon > 0.0 && self.horizon.is_finite()) {
            return Err(SDEError::InvalidParameters(format!(
                "Horizon must be positive and finite, got {}",
                self.horizon
            )));
        }
        Ok(())
    }
}

/// Heston model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HestonParams {
    pub drift: f64,            // μ - drift of the log price
    pub kappa: f64,            // κ - mean reversion speed
    pub theta: f64,            // θ - long-term variance
    pub vol_of_vol: f64,       // ξ - volatility of variance
    pub rho: f64,              // ρ - correlation between price and variance shocks
    pub initial_variance: f64, // v₀
}

impl Default for HestonParams {
    fn default() -> Self {
        Self {
            drift: 0.05,
            kappa: 5.0,
            theta: 0.04,
            vol_of_vol: 0.5,
            rho: -0.5,
            initial_variance: 0.04,
        }
    }
}

impl HestonParams {
    pub fn validate(&self) -> Result<(), SDEError> {
        let finite = [
            self.drift,
            self.kappa,
            self.theta,
            self.vol_of_vol,
            self.rho,
            self.initial_variance,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(SDEError::InvalidParameters(
                "Heston parameters must be finite".to_string(),
            ));
        }
        if self.kappa < 0.0 {
            return Err(SDEError::InvalidParameters(
                "Mean reversion speed must be non-negative".to_string(),
            ));
        }
        if self.theta < 0.0 {
            return Err(SDEError::InvalidParameters(
                "Long-term variance must be non-negative".to_string(),
            ));
        }
        if self.vol_of_vol < 0.0 {
            return Err(SDEError::InvalidParameters(
                "Volatility of variance must be non-negative".to_string(),
            ));
        }
        if self.initial_variance < 0.0 {
            return Err(SDEError::InvalidParameters(
                "Initial variance must be non-negative".to_string(),
            ));
        }
        if self.rho <= -1.0 || self.rho >= 1.0 {
            return Err(SDEError::InvalidParameters(
                "Correlation must lie strictly inside (-1, 1)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Jump component of the Heston-Bates model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpParams {
    pub intensity: f64, // λ - jump arrival rate per unit of model time
    pub mu: f64,        // mean of the log jump size
    pub sigma: f64,     // standard deviation of the log jump size
}

impl Default for JumpParams {
    fn default() -> Self {
        Self {
            intensity: TRADING_DAYS_PER_YEAR,
            mu: 0.0,
            sigma: 0.005,
        }
    }
}

impl JumpParams {
    pub fn validate(&self) -> Result<(), SDEError> {
        if !(self.intensity >= 0.0 && self.intensity.is_finite()) {
            return Err(SDEError::InvalidParameters(
                "Jump intensity must be non-negative and finite".to_string(),
            ));
        }
        if !self.mu.is_finite() {
            return Err(SDEError::InvalidParameters(
                "Jump mean must be finite".to_string(),
            ));
        }
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return Err(SDEError::InvalidParameters(
                "Jump standard deviation must be non-negative and finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Heston stochastic volatility model state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HestonState {
    pub log_price: f64,
    pub variance: f64,
    /// Jump factor applied on the step that produced this state (1.0 if none)
    pub jump_multiplier: f64,
}

/// Simulated one-day latent path.
///
/// Immutable once produced; `variance[t] >= 0` for every `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub log_price: Vec<f64>,
    pub variance: Vec<f64>,
    pub jump_multiplier: Option<Vec<f64>>,
    pub dt: f64,
}

impl Path {
    pub fn from_states(states: &[HestonState], dt: f64, with_jumps: bool) -> Self {
        Self {
            log_price: states.iter().map(|s| s.log_price).collect(),
            variance: states.iter().map(|s| s.variance).collect(),
            jump_multiplier: with_jumps
                .then(|| states.iter().map(|s| s.jump_multiplier).collect()),
            dt,
        }
    }

    pub fn len(&self) -> usize {
        self.log_price.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_price.is_empty()
    }

    /// ∫ v dt as the left Riemann sum matching the Euler scheme.
    pub fn integrated_variance(&self) -> f64 {
        let n = self.variance.len().saturating_sub(1);
        self.variance[..n].iter().sum::<f64>() * self.dt
    }

    /// ∫ v² dt as the left Riemann sum matching the Euler scheme.
    pub fn integrated_quarticity(&self) -> f64 {
        let n = self.variance.len().saturating_sub(1);
        self.variance[..n].iter().map(|v| v * v).sum::<f64>() * self.dt
    }

    /// Sum of squared log jump sizes.
    pub fn jump_variation(&self) -> f64 {
        self.jump_multiplier
            .as_ref()
            .map(|m| {
                m.iter()
                    .map(|j| {
                        let log_jump = j.ln();
                        log_jump * log_jump
                    })
                    .sum()
            })
            .unwrap_or(0.0)
    }

    pub fn jump_count(&self) -> usize {
        self.jump_multiplier
            .as_ref()
            .map(|m| m.iter().filter(|&&j| j != 1.0).count())
            .unwrap_or(0)
    }

    /// Continuous integrated variance plus jump variation.
    pub fn quadratic_variation(&self) -> f64 {
        self.integrated_variance() + self.jump_variation()
    }
}

/// Heston model solver with full truncation scheme and optional Bates jumps
#[derive(Debug, Clone)]
pub struct HestonSolver {
    params: HestonParams,
    jumps: Option<JumpParams>,
    cholesky: Matrix2<f64>,
    jump_size: Option<LogNormal<f64>>,
}

impl HestonSolver {
    pub fn new(params: HestonParams) -> Result<Self, SDEError> {
        Self::with_jumps(params, None)
    }

    pub fn with_jumps(params: HestonParams, jumps: Option<JumpParams>) -> Result<Self, SDEError> {
        params.validate()?;

        let correlation = Matrix2::new(1.0, params.rho, params.rho, 1.0);
        let cholesky = correlation
            .cholesky()
            .ok_or_else(|| {
                SDEError::InvalidParameters(
                    "Correlation matrix is not positive definite".to_string(),
                )
            })?
            .l();

        let jump_size = match jumps {
            Some(jp) => {
                jp.validate()?;
                Some(
                    LogNormal::new(jp.mu, jp.sigma)
                        .map_err(|e| SDEError::InvalidParameters(e.to_string()))?,
                )
            }
            None => None,
        };

        Ok(Self {
            params,
            jumps,
            cholesky,
            jump_size,
        })
    }

    pub fn params(&self) -> &HestonParams {
        &self.params
    }

    pub fn has_jumps(&self) -> bool {
        self.jumps.is_some()
    }

    /// Draw (dW1, dW2) with unit-time correlation ρ, scaled by √dt.
    pub(crate) fn correlated_increments<R: Rng + ?Sized>(&self, dt: f64, rng: &mut R) -> (f64, f64) {
        let z1: f64 = StandardNormal.sample(rng);
        let z2: f64 = StandardNormal.sample(rng);
        let dw = self.cholesky * Vector2::new(z1, z2) * dt.sqrt();
        (dw[0], dw[1])
    }

    fn draw_jump<R: Rng + ?Sized>(&self, dt: f64, rng: &mut R) -> f64 {
        match (self.jumps, self.jump_size) {
            (Some(jp), Some(size)) => {
                if rng.gen::<f64>() < jp.intensity * dt {
                    size.sample(rng)
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }

    /// Simulate one trading day starting from `initial_log_price` and `v₀`.
    pub fn simulate_day<R: Rng + ?Sized>(
        &self,
        grid: &SamplingGrid,
        initial_log_price: f64,
        rng: &mut R,
    ) -> Result<Path, SDEError> {
        grid.validate()?;
        let dt = grid.dt();
        let initial = HestonState {
            log_price: initial_log_price,
            variance: self.params.initial_variance,
            jump_multiplier: 1.0,
        };
        let states = self.solve_path(initial, dt, grid.seconds_per_day, rng)?;
        Ok(Path::from_states(&states, dt, self.has_jumps()))
    }
}

impl SDESolver for HestonSolver {
    type State = HestonState;

    fn solve_step<R: Rng + ?Sized>(
        &self,
        dt: f64,
        state: &HestonState,
        rng: &mut R,
    ) -> Result<HestonState, SDEError> {
        // Heston model in log price:
        // dX_t = (μ - v_t/2) dt + √v_t dW₁_t
        // dv_t = κ(θ - v_t) dt + ξ √v_t dW₂_t,  dW₁ dW₂ = ρ dt
        let p = &self.params;
        let (dw1, dw2) = self.correlated_increments(dt, rng);

        let v_prev = state.variance.max(0.0);
        let sigma = v_prev.sqrt();

        let variance =
            (v_prev + p.kappa * (p.theta - v_prev) * dt + p.vol_of_vol * sigma * dw2).max(0.0);

        let jump_multiplier = self.draw_jump(dt, rng);
        let log_price =
            state.log_price + (p.drift - 0.5 * v_prev) * dt + sigma * dw1 + jump_multiplier.ln();

        if !log_price.is_finite() || !variance.is_finite() {
            return Err(SDEError::SimulationError(format!(
                "Non-finite state after step: log_price={}, variance={}",
                log_price, variance
            )));
        }

        Ok(HestonState {
            log_price,
            variance,
            jump_multiplier,
        })
    }
}
