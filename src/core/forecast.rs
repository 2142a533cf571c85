//! Forecast result structure for holding dated predictions and bands.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Headline numbers of a forecast: mean point estimate and the widest band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub mean: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Point predictions with an 80% interval over a contiguous daily horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastResult {
    dates: Vec<NaiveDate>,
    point: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ForecastResult {
    /// Build a result from aligned columns.
    pub fn new(
        dates: Vec<NaiveDate>,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        for len in [point.len(), lower.len(), upper.len()] {
            if len != dates.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: dates.len(),
                    got: len,
                });
            }
        }

        Ok(Self {
            dates,
            point,
            lower,
            upper,
        })
    }

    /// Get the forecast horizon (number of days).
    pub fn horizon(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn yhat(&self) -> &[f64] {
        &self.point
    }

    pub fn p10(&self) -> &[f64] {
        &self.lower
    }

    pub fn p90(&self) -> &[f64] {
        &self.upper
    }

    /// Iterate over rows in date order.
    pub fn points(&self) -> impl Iterator<Item = ForecastPoint> + '_ {
        self.dates.iter().enumerate().map(|(i, &date)| ForecastPoint {
            date,
            yhat: self.point[i],
            p10: self.lower[i],
            p90: self.upper[i],
        })
    }

    /// Mean of the point forecast, lowest p10 and highest p90.
    pub fn summary(&self) -> Option<ForecastSummary> {
        if self.is_empty() {
            return None;
        }
        let mean = self.point.iter().sum::<f64>() / self.point.len() as f64;
        let p10 = self.lower.iter().copied().fold(f64::INFINITY, f64::min);
        let p90 = self.upper.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(ForecastSummary { mean, p10, p90 })
    }
}
