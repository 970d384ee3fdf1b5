//! Realized variance estimators on an observed log-price path.
//!
//! All estimators take the observed path `Y[0..=N]` (log prices, not returns)
//! and are pure functions. Subsampled statistics use strided accumulators per
//! residue class mod K, so no subgrid is materialised.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid stride of the fixed five-minute estimator on one-second data.
pub const FIVE_MINUTE_STRIDE: usize = 300;

/// Sum of squared increments and increment count along `Y[offset::stride]`.
fn strided_rv(y: &[f64], offset: usize, stride: usize) -> (f64, usize) {
    let mut points = y.iter().skip(offset).step_by(stride);
    let mut prev = match points.next() {
        Some(&first) => first,
        None => return (0.0, 0),
    };

    let mut sum = 0.0;
    let mut count = 0;
    for &current in points {
        let d = current - prev;
        sum += d * d;
        count += 1;
        prev = current;
    }
    (sum, count)
}

/// Full-frequency realized variance `Σ (Y[t] - Y[t-1])²`.
pub fn naive_rv(y: &[f64]) -> f64 {
    let mut sum = 0.0;
    for w in y.windows(2) {
        let d = w[1] - w[0];
        sum += d * d;
    }
    sum
}

/// Realized variance on the sparse grid `Y[0], Y[stride], Y[2·stride], ...`.
pub fn sparse_rv(y: &[f64], stride: usize) -> f64 {
    strided_rv(y, 0, stride.max(1)).0
}

/// Realized variance on a five-minute grid assuming one-second sampling.
pub fn five_min_rv(y: &[f64]) -> f64 {
    sparse_rv(y, FIVE_MINUTE_STRIDE)
}

/// Average of the naive RV over K interleaved subgrids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsampledRv {
    pub average: f64,
    /// Increment count `n_k` on each subgrid `Y[k::K]`
    pub grid_counts: Vec<usize>,
}

impl SubsampledRv {
    pub fn k(&self) -> usize {
        self.grid_counts.len()
    }

    /// Mean subgrid increment count `n̄`.
    pub fn mean_count(&self) -> f64 {
        if self.grid_counts.is_empty() {
            return 0.0;
        }
        self.grid_counts.iter().sum::<usize>() as f64 / self.grid_counts.len() as f64
    }
}

/// Subsampled realized variance with K clamped to `[1, len(Y)]`.
///
/// Subgrids have unequal length when `len(Y)` is not divisible by K.
pub fn subsampled_rv(y: &[f64], k: usize) -> SubsampledRv {
    let k = k.clamp(1, y.len().max(1));

    let mut total = 0.0;
    let mut grid_counts = Vec::with_capacity(k);
    for offset in 0..k {
        let (sum, count) = strided_rv(y, offset, k);
        total += sum;
        grid_counts.push(count);
    }

    SubsampledRv {
        average: total / k as f64,
        grid_counts,
    }
}

/// Zhang-Mykland-Aït-Sahalia two-scale realized variance.
///
/// `max{(n·avg_sub − n̄·full) / (n − n̄), 0}` with `n = N` increments. K ≤ 1
/// disables the bias correction and returns the naive RV.
pub fn zma_rv(y: &[f64], k: usize) -> f64 {
    let n = y.len().saturating_sub(1);
    if n == 0 {
        return 0.0;
    }

    let full = naive_rv(y);
    if k <= 1 {
        return full;
    }

    let sub = subsampled_rv(y, k);
    let n = n as f64;
    let n_bar = sub.mean_count();
    let denominator = n - n_bar;
    if denominator <= 0.0 {
        return full;
    }

    ((n * sub.average - n_bar * full) / denominator).max(0.0)
}

/// Names of the estimators in the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RvEstimator {
    Naive,
    Subsample,
    FiveMin,
    Zma,
}

impl RvEstimator {
    pub const ALL: [RvEstimator; 4] = [
        RvEstimator::Naive,
        RvEstimator::Subsample,
        RvEstimator::FiveMin,
        RvEstimator::Zma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RvEstimator::Naive => "Naive",
            RvEstimator::Subsample => "Subsample",
            RvEstimator::FiveMin => "FiveMin",
            RvEstimator::Zma => "ZMA",
        }
    }
}

impl fmt::Display for RvEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All four estimates for one path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RvBank {
    pub naive: f64,
    pub subsample: f64,
    pub five_min: f64,
    pub zma: f64,
}

impl RvBank {
    pub fn compute(y: &[f64], k_sub: usize, k_zma: usize, five_min_stride: usize) -> Self {
        Self {
            naive: naive_rv(y),
            subsample: subsampled_rv(y, k_sub).average,
            five_min: sparse_rv(y, five_min_stride),
            zma: zma_rv(y, k_zma),
        }
    }

    pub fn get(&self, estimator: RvEstimator) -> f64 {
        match estimator {
            RvEstimator::Naive => self.naive,
            RvEstimator::Subsample => self.subsample,
            RvEstimator::FiveMin => self.five_min,
            RvEstimator::Zma => self.zma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_naive_rv() {
        let y = vec![0.0, 0.1, 0.0, 0.2];
        assert_relative_eq!(naive_rv(&y), 0.01 + 0.01 + 0.04, epsilon = 1e-15);
        assert_eq!(naive_rv(&[]), 0.0);
        assert_eq!(naive_rv(&[1.0]), 0.0);
    }

    #[test]
    fn test_subsample_k1_is_naive() {
        let y: Vec<f64> = (0..101).map(|i| ((i * 37 % 11) as f64).sin() * 0.01).collect();
        let sub = subsampled_rv(&y, 1);
        assert_eq!(sub.average, naive_rv(&y));
        assert_eq!(sub.grid_counts, vec![100]);
    }

    #[test]
    fn test_subsample_grid_counts() {
        // 10 points, K = 3: grids {0,3,6,9}, {1,4,7}, {2,5,8}
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let sub = subsampled_rv(&y, 3);

        assert_eq!(sub.grid_counts, vec![3, 2, 2]);
        assert_relative_eq!(sub.mean_count(), 7.0 / 3.0);
        // every step on every grid is 3 units
        assert_relative_eq!(sub.average, (3.0 * 9.0 + 2.0 * 9.0 + 2.0 * 9.0) / 3.0);
    }

    #[test]
    fn test_subsample_clamps_k() {
        let y = vec![0.0, 1.0, 3.0];
        let sub = subsampled_rv(&y, 50);
        assert_eq!(sub.k(), 3);
        assert_eq!(sub.average, 0.0);

        let zero = subsampled_rv(&y, 0);
        assert_eq!(zero.k(), 1);
    }

    #[test]
    fn test_sparse_and_five_min() {
        let y: Vec<f64> = (0..=900).map(|i| i as f64 * 0.001).collect();
        // 3 increments of 0.3 each
        assert_relative_eq!(five_min_rv(&y), 3.0 * 0.09, epsilon = 1e-12);
        assert_eq!(sparse_rv(&y, 1), naive_rv(&y));
        assert_eq!(sparse_rv(&y, 0), naive_rv(&y));
        assert_eq!(five_min_rv(&y[..200]), 0.0);
    }

    #[test]
    fn test_zma_constant_path_is_zero() {
        let y = vec![4.6; 1_000];
        for k in [0, 1, 2, 7, 100, 999, 1_000, 5_000] {
            assert_eq!(zma_rv(&y, k), 0.0);
        }
    }

    #[test]
    fn test_zma_floor() {
        // Pure alternating noise: the fast scale dominates and the raw
        // two-scale value is negative
        let y: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 0.0 } else { 0.01 })
            .collect();
        assert_eq!(zma_rv(&y, 2), 0.0);
    }

    #[test]
    fn test_zma_k1_falls_back_to_naive() {
        let y = vec![0.0, 0.02, 0.01, 0.03];
        assert_eq!(zma_rv(&y, 1), naive_rv(&y));
        assert_eq!(zma_rv(&y, 0), naive_rv(&y));
    }

    #[test]
    fn test_zma_removes_linear_noise_bias() {
        // Linear trend plus alternating ±a noise. With an odd K every
        // subgrid still alternates, so both scales carry the same 4a² per step.
        let n = 10_000;
        let a = 0.001;
        let step = 1e-5;
        let y: Vec<f64> = (0..=n)
            .map(|i| i as f64 * step + if i % 2 == 0 { a } else { -a })
            .collect();
        let clean: Vec<f64> = (0..=n).map(|i| i as f64 * step).collect();

        let truth = naive_rv(&clean);
        let zma = zma_rv(&y, 11);
        assert!(naive_rv(&y) > 100.0 * truth);
        assert!((zma - truth).abs() < (naive_rv(&y) - truth).abs() / 100.0);
    }

    #[test]
    fn test_bank() {
        let y: Vec<f64> = (0..=1_200).map(|i| (i as f64 * 0.01).sin() * 0.01).collect();
        let bank = RvBank::compute(&y, 5, 3, FIVE_MINUTE_STRIDE);

        assert_eq!(bank.get(RvEstimator::Naive), naive_rv(&y));
        assert_eq!(bank.get(RvEstimator::Subsample), subsampled_rv(&y, 5).average);
        assert_eq!(bank.get(RvEstimator::FiveMin), five_min_rv(&y));
        assert_eq!(bank.get(RvEstimator::Zma), zma_rv(&y, 3));
        assert_eq!(RvEstimator::Zma.to_string(), "ZMA");
    }
}
