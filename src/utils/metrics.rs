//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Floor on |actual| in the MAPE denominator.
pub const MAPE_EPSILON: f64 = 1e-6;
/// Added to the WMAPE denominator.
pub const WMAPE_EPSILON: f64 = 1e-8;

/// Accuracy metrics for one evaluation window.
///
/// Percentage metrics are fractions (0.1 means 10%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error, with |actual| floored at `MAPE_EPSILON`
    pub mape: f64,
    /// Weighted MAPE: total absolute error over total absolute actuals
    pub wmape: f64,
}

/// Calculate accuracy metrics between actual and predicted values.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyInput);
    }

    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    Ok(AccuracyMetrics {
        mae: mae(actual, predicted),
        mape: mape(actual, predicted),
        wmape: wmape(actual, predicted),
    })
}

/// Calculate MAE between two slices.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate MAPE between two slices.
///
/// mean(|a - p| / max(|a|, 1e-6))
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(MAPE_EPSILON))
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate WMAPE between two slices.
///
/// sum(|a - p|) / (sum(|a|) + 1e-8)
pub fn wmape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let error: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    let scale: f64 = actual.iter().map(|a| a.abs()).sum();
    error / (scale + WMAPE_EPSILON)
}
