//! Bias, variance and RMSE of each estimator against the ensemble truth.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::estimators::RvEstimator;
use crate::models::simulation::{EnsembleResult, SimulationError};
use crate::utils::statistics::{mean, population_variance, rms};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRow {
    pub estimator: String,
    pub bias: f64,
    /// Population variance of the error (denominator M)
    pub variance: f64,
    pub rmse: f64,
}

/// Score one estimate column against the truth column.
pub fn score_column(
    estimator: &str,
    estimates: &[f64],
    truth: &[f64],
) -> Result<AccuracyRow, SimulationError> {
    if estimates.is_empty() {
        return Err(SimulationError::InsufficientData(format!(
            "No estimates to score for {}",
            estimator
        )));
    }
    if estimates.len() != truth.len() {
        return Err(SimulationError::InsufficientData(format!(
            "{} has {} estimates but truth has {} rows",
            estimator,
            estimates.len(),
            truth.len()
        )));
    }

    let diff: Vec<f64> = estimates.iter().zip(truth).map(|(m, t)| m - t).collect();

    Ok(AccuracyRow {
        estimator: estimator.to_string(),
        bias: mean(&diff),
        variance: population_variance(&diff),
        rmse: rms(&diff),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub n_trials: usize,
    pub rows: Vec<AccuracyRow>,
}

impl AccuracyReport {
    pub fn from_ensemble(ensemble: &EnsembleResult) -> Result<Self, SimulationError> {
        let truth = ensemble.truth();
        let rows = RvEstimator::ALL
            .iter()
            .map(|&est| score_column(est.name(), &ensemble.column(est), &truth))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            n_trials: ensemble.len(),
            rows,
        })
    }

    pub fn row(&self, estimator: RvEstimator) -> Option<&AccuracyRow> {
        self.rows.iter().find(|r| r.estimator == estimator.name())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Estimator accuracy over {} trials", self.n_trials)?;
        writeln!(
            f,
            "{:<10} {:>14} {:>14} {:>14}",
            "estimator", "bias", "variance", "rmse"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10} {:>14.6e} {:>14.6e} {:>14.6e}",
                row.estimator, row.bias, row.variance, row.rmse
            )?;
        }
        Ok(())
    }
}
