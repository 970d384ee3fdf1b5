pub mod statistics;

pub use statistics::{lag_one_autocorrelation, mean, population_variance, rms};
