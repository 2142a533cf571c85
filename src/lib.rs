//! # demand-forecast
//!
//! Short-horizon daily retail demand forecasting.
//!
//! Raw daily sales rows are normalized into a gap-free series, turned into a
//! design matrix of weekday indicators, declared exogenous columns and an
//! optional public holiday flag, and fitted with closed-form ridge
//! regression. Every forecast is preceded by a rolling-origin backtest so the
//! reported accuracy is out of sample.
//!
//! Around that core sit a CSV loader, a parallel batch runner with pluggable
//! sources and sinks, and an artifact writer.

#![allow(clippy::needless_range_loop)]

pub mod artifacts;
pub mod calendar;
pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod io;
pub mod models;
pub mod service;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::calendar::{HolidayCalendar, HolidayTable, NoHolidays, PublicHolidays};
    pub use crate::config::ForecastConfig;
    pub use crate::core::{DailySeries, ForecastResult, SalesRecord};
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{FeatureBuilder, FeatureConfig};
    pub use crate::forecaster::{DemandForecaster, ForecastOutcome};
    pub use crate::models::{FittedModel, RidgeRegression};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics, BacktestMetrics, Backtester};
}
