//! Mathematical building blocks for the realized variance studies
//!
//! This module provides the latent price simulator and the microstructure
//! noise generator used by the Monte Carlo driver.

pub mod noise;
pub mod sde_solvers;

// Re-export commonly used types
pub use noise::{NoiseError, NoiseSpec, NoisyObservation, VarianceProfile};
pub use sde_solvers::{
    HestonParams, HestonSolver, HestonState, JumpParams, Path, SDEError, SDESolver, SamplingGrid,
    SECONDS_PER_TRADING_DAY, TRADING_DAYS_PER_YEAR,
};
