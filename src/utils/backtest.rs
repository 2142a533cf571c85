//! Rolling-origin backtests of the ridge demand model.

use crate::core::DailySeries;
use crate::error::{ForecastError, Result};
use crate::features::FeatureBuilder;
use crate::models::RidgeRegression;
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for a rolling-origin backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    /// Number of folds.
    pub folds: usize,
    /// Length of each test window in days.
    pub horizon: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            folds: 3,
            horizon: 14,
        }
    }
}

impl BacktestConfig {
    pub fn new(folds: usize, horizon: usize) -> Self {
        Self { folds, horizon }
    }

    /// Minimum series length able to hold every fold.
    pub fn required_history(&self) -> usize {
        self.horizon * (self.folds + 1)
    }

    /// Row ranges of each fold for a series of `n` days, oldest first.
    ///
    /// Folds are spaced `max(h, n / (k + 1))` days apart and the last test
    /// window ends on the final day.
    pub fn windows(&self, n: usize) -> Result<Vec<FoldWindow>> {
        if self.folds == 0 || self.horizon == 0 {
            return Err(ForecastError::InvalidConfiguration(format!(
                "backtest needs at least one fold and a positive horizon, got {} folds of {} days",
                self.folds, self.horizon
            )));
        }
        let needed = self.required_history();
        if n < needed {
            return Err(ForecastError::InsufficientHistory { needed, got: n });
        }

        let spacing = self.horizon.max(n / (self.folds + 1));
        Ok((0..self.folds)
            .map(|i| {
                let test_end = n - (self.folds - 1 - i) * spacing;
                FoldWindow {
                    test_start: test_end - self.horizon,
                    test_end,
                }
            })
            .collect())
    }
}

/// One fold: train on `0..test_start`, test on `test_start..test_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldWindow {
    pub test_start: usize,
    pub test_end: usize,
}

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub train_len: usize,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub metrics: AccuracyMetrics,
}

/// Backtest metrics averaged over folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub mape: f64,
    pub wmape: f64,
    pub mae: f64,
    /// Number of folds evaluated.
    pub folds: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fold_results: Vec<FoldResult>,
}

/// Walk-forward evaluation of feature building plus ridge fitting.
pub struct Backtester<'a> {
    builder: &'a FeatureBuilder<'a>,
    estimator: RidgeRegression,
    config: BacktestConfig,
}

impl<'a> Backtester<'a> {
    pub fn new(
        builder: &'a FeatureBuilder<'a>,
        estimator: RidgeRegression,
        config: BacktestConfig,
    ) -> Self {
        Self {
            builder,
            estimator,
            config,
        }
    }

    /// Run every fold and average the metrics.
    pub fn run(&self, series: &DailySeries) -> Result<BacktestMetrics> {
        let windows = self.config.windows(series.len())?;
        let mut fold_results = Vec::with_capacity(windows.len());

        for window in &windows {
            let train = series.slice(0, window.test_start)?;
            let test = series.slice(window.test_start, window.test_end)?;

            let (x_train, y_train) = self.builder.training(&train)?;
            let model = self.estimator.fit(&x_train, &y_train)?;

            let (x_test, y_test) = self.builder.training(&test)?;
            let predictions = model.predict(&x_test)?;
            let metrics = calculate_metrics(&y_test, &predictions)?;

            let (test_start, test_end) = match (test.start_date(), test.end_date()) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(ForecastError::EmptyInput),
            };
            debug!(
                train_len = train.len(),
                %test_start,
                %test_end,
                mae = metrics.mae,
                wmape = metrics.wmape,
                "backtest fold"
            );

            fold_results.push(FoldResult {
                train_len: train.len(),
                test_start,
                test_end,
                metrics,
            });
        }

        let folds = fold_results.len();
        let average = |f: fn(&AccuracyMetrics) -> f64| {
            fold_results.iter().map(|r| f(&r.metrics)).sum::<f64>() / folds as f64
        };

        Ok(BacktestMetrics {
            mape: average(|m| m.mape),
            wmape: average(|m| m.wmape),
            mae: average(|m| m.mae),
            folds,
            fold_results,
        })
    }
}
