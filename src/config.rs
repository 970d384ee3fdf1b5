//! Run configuration for the Monte Carlo study and the empirical pipeline

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::estimators::FIVE_MINUTE_STRIDE;
use crate::math::{HestonParams, JumpParams, NoiseSpec, SamplingGrid};
use crate::models::simulation::KSelection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RvConfig {
    pub heston: HestonParams,
    /// Bates jump component; `None` simulates pure Heston
    pub jumps: Option<JumpParams>,
    pub noise: NoiseSpec,
    pub grid: SamplingGrid,
    pub n_trials: usize,
    pub seed: u64,
    pub parallel: bool,
    pub k_selection: KSelection,
    pub initial_log_price: f64,
    pub empirical: EmpiricalConfig,
}

impl Default for RvConfig {
    fn default() -> Self {
        Self {
            heston: HestonParams::default(),
            jumps: None,
            noise: NoiseSpec::default(),
            grid: SamplingGrid::default(),
            n_trials: 1000,
            seed: 42,
            parallel: true,
            k_selection: KSelection::Oracle,
            initial_log_price: 100f64.ln(),
            empirical: EmpiricalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpiricalConfig {
    pub five_min_stride: usize,
    /// Horizon T fed to the optimal-K formulas, one trading day as the unit
    pub horizon: f64,
}

impl Default for EmpiricalConfig {
    fn default() -> Self {
        Self {
            five_min_stride: FIVE_MINUTE_STRIDE,
            horizon: 1.0,
        }
    }
}

impl EmpiricalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.five_min_stride == 0 {
            return Err(ConfigError::Invalid(
                "Five-minute stride must be positive".to_string(),
            ));
        }
        if !(self.horizon > 0.0 && self.horizon.is_finite()) {
            return Err(ConfigError::Invalid(
                "Empirical horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl RvConfig {
    /// Read and validate a TOML configuration file.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RvConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heston
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some(jumps) = &self.jumps {
            jumps
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        self.noise
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.grid
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.n_trials == 0 {
            return Err(ConfigError::Invalid(
                "Number of trials must be positive".to_string(),
            ));
        }
        if !self.initial_log_price.is_finite() {
            return Err(ConfigError::Invalid(
                "Initial log price must be finite".to_string(),
            ));
        }
        self.empirical.validate()
    }
}
