//! Statistical utility functions.

/// Two-sided 80% interval multiplier: the 90th percentile of N(0, 1).
pub const Z_P90: f64 = 1.2816;

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the population variance of a slice (denominator n).
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Calculate the population standard deviation of a slice.
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}
