use std::io;
use thiserror::Error;

use crate::math::noise::NoiseError;
use crate::math::sde_solvers::SDEError;
use crate::models::empirical::EmpiricalError;
use crate::models::simulation::SimulationError;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Path simulation error: {0}")]
    Sde(#[from] SDEError),
    #[error("Noise injection error: {0}")]
    Noise(#[from] NoiseError),
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("Empirical pipeline error: {0}")]
    Empirical(#[from] EmpiricalError),
}

pub type Result<T> = std::result::Result<T, EstimationError>;
