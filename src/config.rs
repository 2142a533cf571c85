//! Forecast configuration.
//!
//! Every knob of a forecast run lives here; nothing is read from globals or
//! the environment. Configurations deserialize from JSON with defaults for
//! omitted fields and must pass [`ForecastConfig::validate`] before use.

use crate::error::{ForecastError, Result};
use crate::features::FeatureConfig;
use crate::models::{RidgeRegression, DEFAULT_L2};
use crate::utils::BacktestConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Largest supported forecast horizon in days.
pub const MAX_HORIZON: usize = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Input column holding daily sales.
    pub target_column: String,
    /// Input column holding the calendar date.
    pub date_column: String,
    /// Exogenous input columns, in matrix order.
    pub exog_columns: Vec<String>,
    /// Country code for the holiday indicator; `None` drops the column.
    pub country: Option<String>,
    /// Days to forecast.
    pub horizon: usize,
    /// Ridge penalty.
    pub l2: f64,
    pub backtest_folds: usize,
    /// Upper bound on the backtest test window; capped by `horizon`.
    pub backtest_horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            target_column: "sales".to_string(),
            date_column: "date".to_string(),
            exog_columns: Vec::new(),
            country: None,
            horizon: 30,
            l2: DEFAULT_L2,
            backtest_folds: 3,
            backtest_horizon: 14,
        }
    }
}

impl ForecastConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_exog(mut self, name: &str) -> Self {
        self.exog_columns.push(name.to_string());
        self
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn with_backtest(mut self, folds: usize, horizon: usize) -> Self {
        self.backtest_folds = folds;
        self.backtest_horizon = horizon;
        self
    }

    pub fn with_columns(mut self, date_column: &str, target_column: &str) -> Self {
        self.date_column = date_column.to_string();
        self.target_column = target_column.to_string();
        self
    }

    /// Check bounds and column references.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidConfiguration(msg));

        if !(1..=MAX_HORIZON).contains(&self.horizon) {
            return invalid(format!(
                "horizon must be within 1..={}, got {}",
                MAX_HORIZON, self.horizon
            ));
        }
        if !self.l2.is_finite() || self.l2 <= 0.0 {
            return invalid(format!("l2 must be positive and finite, got {}", self.l2));
        }
        if self.backtest_folds == 0 {
            return invalid("backtest_folds must be at least 1".to_string());
        }
        if self.backtest_horizon == 0 {
            return invalid("backtest_horizon must be at least 1".to_string());
        }
        if self.target_column.trim().is_empty() || self.date_column.trim().is_empty() {
            return invalid("target and date column names must not be empty".to_string());
        }
        if self.target_column == self.date_column {
            return invalid(format!(
                "target and date columns must differ, both are '{}'",
                self.date_column
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.exog_columns {
            if name.trim().is_empty() {
                return invalid("exogenous column names must not be empty".to_string());
            }
            if FeatureConfig::is_reserved(name) {
                return invalid(format!("exogenous column '{}' uses a reserved name", name));
            }
            if name == &self.target_column || name == &self.date_column {
                return invalid(format!(
                    "exogenous column '{}' is also the target or date column",
                    name
                ));
            }
            if !seen.insert(name.as_str()) {
                return invalid(format!("exogenous column '{}' declared twice", name));
            }
        }

        Ok(())
    }

    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            exog_columns: self.exog_columns.clone(),
            holiday_country: self.country.clone(),
        }
    }

    /// Backtest settings; the test window never exceeds the forecast horizon.
    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig::new(self.backtest_folds, self.backtest_horizon.min(self.horizon))
    }

    pub fn estimator(&self) -> Result<RidgeRegression> {
        RidgeRegression::new(self.l2)
    }
}
