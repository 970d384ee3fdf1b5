//! Monte Carlo driver: simulate → inject noise → select K → estimate, per trial.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RvConfig;
use crate::estimators::{
    log_returns, naive_rv, noise_variance_estimate, realized_quadpower_quarticity, KFallback,
    OptimalK, RvBank, RvEstimator, FIVE_MINUTE_STRIDE,
};
use crate::math::{HestonSolver, NoiseError, SDEError};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Path simulation failed: {0}")]
    Sde(#[from] SDEError),
    #[error("Noise injection failed: {0}")]
    Noise(#[from] NoiseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Source of the `(var_eps, IQ)` pair fed to the optimal-K formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KSelection {
    /// Mean variance of the configured noise and the true integrated quarticity
    #[default]
    Oracle,
    /// `naive/(2n)` and realized quadpower quarticity of the observed path
    Estimated,
}

/// One row of the ensemble table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    /// Integrated variance, or quadratic variation when jumps are simulated
    pub truth: f64,
    pub integrated_variance: f64,
    pub jump_variation: f64,
    pub integrated_quarticity: f64,
    pub var_eps: f64,
    pub k_sub: usize,
    pub k_zma: usize,
    /// Set when the optimal-K selector fell back to `(1, 1)`
    pub k_fallback: Option<KFallback>,
    pub naive: f64,
    pub subsample: f64,
    pub five_min: f64,
    pub zma: f64,
}

impl TrialRecord {
    pub fn estimate(&self, estimator: RvEstimator) -> f64 {
        match estimator {
            RvEstimator::Naive => self.naive,
            RvEstimator::Subsample => self.subsample,
            RvEstimator::FiveMin => self.five_min,
            RvEstimator::Zma => self.zma,
        }
    }
}

/// Append-only table of trial rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    records: Vec<TrialRecord>,
}

impl EnsembleResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    /// Merge another block of trials, keeping rows ordered by trial index.
    pub fn extend(&mut self, other: EnsembleResult) {
        self.records.extend(other.records);
        self.records.sort_by_key(|r| r.trial);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn truth(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.truth).collect()
    }

    pub fn column(&self, estimator: RvEstimator) -> Vec<f64> {
        self.records.iter().map(|r| r.estimate(estimator)).collect()
    }

    pub fn write_csv<P: AsRef<FsPath>>(&self, path: P) -> Result<(), SimulationError> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv<P: AsRef<FsPath>>(path: P) -> Result<Self, SimulationError> {
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<TrialRecord>, csv::Error>>()?;
        Ok(Self { records })
    }
}

impl FromIterator<TrialRecord> for EnsembleResult {
    fn from_iter<I: IntoIterator<Item = TrialRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

pub struct MonteCarloDriver {
    config: RvConfig,
    solver: HestonSolver,
}

impl MonteCarloDriver {
    pub fn new(config: RvConfig) -> Result<Self, SimulationError> {
        config
            .validate()
            .map_err(|e| SimulationError::InvalidParameters(e.to_string()))?;
        let solver = HestonSolver::with_jumps(config.heston, config.jumps)?;
        Ok(Self { config, solver })
    }

    pub fn config(&self) -> &RvConfig {
        &self.config
    }

    /// Run all `n_trials` trials.
    pub fn run(&self) -> Result<EnsembleResult, SimulationError> {
        self.run_range(0, self.config.n_trials)
    }

    /// Run trials `first..first + count`; blocks can be merged with
    /// [`EnsembleResult::extend`] to resume an interrupted sweep.
    pub fn run_range(&self, first: usize, count: usize) -> Result<EnsembleResult, SimulationError> {
        info!(
            first,
            count,
            seed = self.config.seed,
            parallel = self.config.parallel,
            jumps = self.solver.has_jumps(),
            "Starting Monte Carlo block"
        );

        let trials = first..first + count;
        let records = if self.config.parallel {
            trials
                .into_par_iter()
                .map(|i| self.run_trial(i))
                .collect::<Result<Vec<_>, SimulationError>>()?
        } else {
            trials
                .map(|i| self.run_trial(i))
                .collect::<Result<Vec<_>, SimulationError>>()?
        };

        let fallbacks = records.iter().filter(|r| r.k_fallback.is_some()).count();
        let zma_naive = records
            .iter()
            .filter(|r| r.k_fallback.is_none() && r.k_zma <= 1)
            .count();
        if zma_naive > 0 {
            warn!(
                trials = zma_naive,
                k_selection = ?self.config.k_selection,
                "K_zma rounded to 1, ZMA equals naive RV on these trials"
            );
        }

        info!(trials = records.len(), fallbacks, "Monte Carlo block finished");
        Ok(EnsembleResult { records })
    }

    /// One independent trial; trial `i` always draws from `seed + i`.
    pub fn run_trial(&self, trial: usize) -> Result<TrialRecord, SimulationError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(trial as u64));
        let grid = &self.config.grid;

        let path = self
            .solver
            .simulate_day(grid, self.config.initial_log_price, &mut rng)?;
        let observation = self.config.noise.inject(&path.log_price, &mut rng)?;
        let y = observation.as_slice();
        let n = y.len().saturating_sub(1);

        let integrated_variance = path.integrated_variance();
        let jump_variation = path.jump_variation();
        let integrated_quarticity = path.integrated_quarticity();
        let truth = if self.solver.has_jumps() {
            integrated_variance + jump_variation
        } else {
            integrated_variance
        };

        let (var_eps, iq) = match self.config.k_selection {
            KSelection::Oracle => (
                self.config.noise.mean_variance(y.len()),
                integrated_quarticity,
            ),
            KSelection::Estimated => {
                let full = naive_rv(y);
                // RQQ estimates T·IQ
                let rqq = realized_quadpower_quarticity(&log_returns(y)).unwrap_or(0.0);
                (
                    noise_variance_estimate(full, n).unwrap_or(0.0),
                    rqq / grid.horizon,
                )
            }
        };

        let k = OptimalK::select(var_eps, iq, grid.horizon, grid.seconds_per_day);
        let bank = RvBank::compute(y, k.k_sub, k.k_zma, FIVE_MINUTE_STRIDE);

        debug!(
            trial,
            truth,
            k_sub = k.k_sub,
            k_zma = k.k_zma,
            naive = bank.naive,
            zma = bank.zma,
            jumps = path.jump_count(),
            "trial complete"
        );

        Ok(TrialRecord {
            trial,
            truth,
            integrated_variance,
            jump_variation,
            integrated_quarticity,
            var_eps,
            k_sub: k.k_sub,
            k_zma: k.k_zma,
            k_fallback: k.fallback,
            naive: bank.naive,
            subsample: bank.subsample,
            five_min: bank.five_min,
            zma: bank.zma,
        })
    }
}
