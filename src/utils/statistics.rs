//! Statistical helpers for ensemble summaries

/// Calculate the mean of a slice of f64 values
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (denominator n)
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean_val = mean(values);
    values.iter().map(|v| (v - mean_val).powi(2)).sum::<f64>() / values.len() as f64
}

/// Root mean square
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

/// Lag-one autocorrelation, `None` for fewer than two points or a constant series
pub fn lag_one_autocorrelation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let mean_val = mean(values);
    let denom: f64 = values.iter().map(|v| (v - mean_val).powi(2)).sum();
    if denom == 0.0 {
        return None;
    }
    let num: f64 = values
        .windows(2)
        .map(|w| (w[0] - mean_val) * (w[1] - mean_val))
        .sum();
    Some(num / denom)
}
