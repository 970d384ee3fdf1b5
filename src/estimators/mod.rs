//! Realized variance estimators and their tuning parameters

pub mod optimal_k;
pub mod quarticity;
pub mod realized;

pub use optimal_k::{KFallback, OptimalK};
pub use quarticity::{
    bipower_variation, log_returns, noise_variance_estimate, realized_quadpower_quarticity,
};
pub use realized::{
    five_min_rv, naive_rv, sparse_rv, subsampled_rv, zma_rv, RvBank, RvEstimator, SubsampledRv,
    FIVE_MINUTE_STRIDE,
};
