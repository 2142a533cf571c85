//! End-to-end demand forecast for one product history.
//!
//! [`DemandForecaster`] normalizes raw rows, backtests the ridge model on
//! rolling folds, refits on the full history and projects the horizon with
//! a symmetric 80% band.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use demand_forecast::config::ForecastConfig;
//! use demand_forecast::core::SalesRecord;
//! use demand_forecast::forecaster::DemandForecaster;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let records: Vec<_> = start
//!     .iter_days()
//!     .take(90)
//!     .enumerate()
//!     .map(|(i, d)| SalesRecord::new(d, Some(20.0 + (i % 7) as f64)))
//!     .collect();
//!
//! let forecaster = DemandForecaster::new(ForecastConfig::default().with_horizon(14)).unwrap();
//! let outcome = forecaster.run(&records).unwrap();
//!
//! assert_eq!(outcome.forecast.horizon(), 14);
//! assert_eq!(outcome.metrics.folds, 3);
//! ```

use crate::calendar::{HolidayCalendar, PublicHolidays};
use crate::config::ForecastConfig;
use crate::core::{Covariates, DailySeries, ForecastResult, ForecastSummary, SalesRecord};
use crate::error::{ForecastError, Result};
use crate::features::FeatureBuilder;
use crate::models::FittedModel;
use crate::utils::{BacktestMetrics, Backtester, Z_P90};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything one forecast run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub forecast: ForecastResult,
    /// Out-of-sample metrics, computed before the final fit.
    pub metrics: BacktestMetrics,
    pub model: FittedModel,
    /// Days in the normalized training history.
    pub endog_len: usize,
    pub last_date: NaiveDate,
}

impl ForecastOutcome {
    pub fn summary(&self) -> Option<ForecastSummary> {
        self.forecast.summary()
    }

    /// Human-readable model description.
    pub fn model_summary(&self) -> String {
        let mut text = format!(
            "Linear model with features: [{}]\n",
            self.model.feature_names().join(", ")
        );
        for (name, coef) in self.model.feature_names().iter().zip(self.model.coefficients()) {
            text.push_str(&format!("  {:<16} {:>14.6}\n", name, coef));
        }
        text.push_str(&format!(
            "sigma: {:.6}\ntraining days: {}\nbacktest: mape={:.4} wmape={:.4} mae={:.4} over {} folds\n",
            self.model.sigma(),
            self.endog_len,
            self.metrics.mape,
            self.metrics.wmape,
            self.metrics.mae,
            self.metrics.folds
        ));
        text
    }
}

/// Runs the normalize, backtest, fit and predict pipeline.
#[derive(Clone)]
pub struct DemandForecaster {
    config: ForecastConfig,
    calendar: Arc<dyn HolidayCalendar>,
}

impl std::fmt::Debug for DemandForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandForecaster")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DemandForecaster {
    /// Forecaster using the built-in public holiday rules.
    pub fn new(config: ForecastConfig) -> Result<Self> {
        Self::with_calendar(config, Arc::new(PublicHolidays::new()))
    }

    pub fn with_calendar(
        config: ForecastConfig,
        calendar: Arc<dyn HolidayCalendar>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, calendar })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast from raw rows.
    pub fn run(&self, records: &[SalesRecord]) -> Result<ForecastOutcome> {
        let series = DailySeries::normalize(records, &self.config.exog_columns)?;
        self.run_series(&series)
    }

    /// Forecast from an already normalized series.
    pub fn run_series(&self, series: &DailySeries) -> Result<ForecastOutcome> {
        let features = self.config.feature_config();
        let builder = FeatureBuilder::new(&features, self.calendar.as_ref());
        let estimator = self.config.estimator()?;

        let metrics =
            Backtester::new(&builder, estimator, self.config.backtest_config()).run(series)?;
        debug!(
            mape = metrics.mape,
            wmape = metrics.wmape,
            mae = metrics.mae,
            folds = metrics.folds,
            "backtest complete"
        );

        let (x, y) = builder.training(series)?;
        let model = estimator.fit(&x, &y)?;
        debug!(sigma = model.sigma(), rows = model.n_obs(), "final fit");

        let future = series.future(self.config.horizon)?;
        let x_future = builder.design(&future)?;
        let yhat = model.predict(&x_future)?;

        let band = Z_P90 * model.sigma();
        let p10 = yhat.iter().map(|v| v - band).collect();
        let p90 = yhat.iter().map(|v| v + band).collect();
        let forecast = ForecastResult::new(future.dates().to_vec(), yhat, p10, p90)?;

        let last_date = series.end_date().ok_or(ForecastError::EmptyInput)?;
        info!(
            days = series.len(),
            horizon = forecast.horizon(),
            %last_date,
            "forecast complete"
        );

        Ok(ForecastOutcome {
            forecast,
            metrics,
            model,
            endog_len: series.len(),
            last_date,
        })
    }
}
