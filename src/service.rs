//! Batch forecasting across products.
//!
//! A [`BatchRunner`] loads each requested product from a [`SalesSource`],
//! runs the forecast pipeline and upserts the rows into a [`ForecastSink`].
//! Products are independent and run in parallel; one product failing never
//! aborts the others.

use crate::calendar::{HolidayCalendar, PublicHolidays};
use crate::config::{ForecastConfig, MAX_HORIZON};
use crate::core::{ForecastResult, SalesRecord};
use crate::error::{ForecastError, Result};
use crate::forecaster::DemandForecaster;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Identity of one product history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub account_id: String,
    pub product_id: String,
}

impl ProductKey {
    pub fn new(account_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            product_id: product_id.into(),
        }
    }
}

/// Supplies the raw daily rows of one product.
pub trait SalesSource: Send + Sync {
    fn load(&self, key: &ProductKey) -> Result<Vec<SalesRecord>>;
}

/// One persisted forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub country: Option<String>,
    pub yhat: f64,
    pub p10: f64,
    pub p90: f64,
    pub run_id: String,
}

/// Receives forecast rows keyed by `(account, product, date)`.
pub trait ForecastSink: Send + Sync {
    /// Insert or replace one row per forecast day. Returns the rows written.
    fn upsert(
        &self,
        key: &ProductKey,
        country: Option<&str>,
        run_id: &str,
        forecast: &ForecastResult,
    ) -> Result<usize>;
}

/// In-memory sink; later writes replace earlier ones for the same day.
///
/// A write without a country keeps the country already stored for that day.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<BTreeMap<(ProductKey, NaiveDate), ForecastRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored rows of one product, by date.
    pub fn rows_for(&self, key: &ProductKey) -> Result<Vec<ForecastRow>> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(_, row)| row.clone())
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<(ProductKey, NaiveDate), ForecastRow>>> {
        self.rows
            .lock()
            .map_err(|_| ForecastError::Io("forecast sink lock poisoned".to_string()))
    }
}

impl ForecastSink for MemorySink {
    fn upsert(
        &self,
        key: &ProductKey,
        country: Option<&str>,
        run_id: &str,
        forecast: &ForecastResult,
    ) -> Result<usize> {
        let mut rows = self.lock()?;
        for point in forecast.points() {
            let slot = (key.clone(), point.date);
            let country = country
                .map(str::to_string)
                .or_else(|| rows.get(&slot).and_then(|row| row.country.clone()));
            rows.insert(
                slot,
                ForecastRow {
                    date: point.date,
                    country,
                    yhat: point.yhat,
                    p10: point.p10,
                    p90: point.p90,
                    run_id: run_id.to_string(),
                },
            );
        }
        Ok(forecast.horizon())
    }
}

fn default_horizon_days() -> usize {
    30
}

/// A batch forecast request for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub account_id: String,
    pub product_ids: Vec<String>,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: usize,
    #[serde(default)]
    pub country: Option<String>,
}

impl BatchRequest {
    pub fn new(account_id: &str, product_ids: &[&str]) -> Self {
        Self {
            account_id: account_id.to_string(),
            product_ids: product_ids.iter().map(|p| p.to_string()).collect(),
            horizon_days: default_horizon_days(),
            country: None,
        }
    }

    pub fn with_horizon(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_HORIZON).contains(&self.horizon_days) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "horizon_days must be within 1..={}, got {}",
                MAX_HORIZON, self.horizon_days
            )));
        }
        if self.account_id.trim().is_empty() {
            return Err(ForecastError::InvalidConfiguration(
                "account_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Headline numbers of one product's forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub horizon_days: usize,
    /// Mean point forecast over the horizon.
    pub mean: f64,
    /// Lowest lower bound over the horizon.
    pub p10: f64,
    /// Highest upper bound over the horizon.
    pub p90: f64,
}

/// Per-product outcome of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductReport {
    Completed(ProductSummary),
    Failed { product_id: String, error: String },
}

impl ProductReport {
    pub fn product_id(&self) -> &str {
        match self {
            ProductReport::Completed(summary) => &summary.product_id,
            ProductReport::Failed { product_id, .. } => product_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ProductReport::Completed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    /// One entry per requested product, in request order.
    pub products: Vec<ProductReport>,
}

impl BatchReport {
    pub fn summaries(&self) -> impl Iterator<Item = &ProductSummary> {
        self.products.iter().filter_map(|report| match report {
            ProductReport::Completed(summary) => Some(summary),
            ProductReport::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProductReport> {
        self.products.iter().filter(|report| !report.is_completed())
    }
}

/// Runs forecasts for every product of a [`BatchRequest`].
#[derive(Clone)]
pub struct BatchRunner {
    config: ForecastConfig,
    calendar: Arc<dyn HolidayCalendar>,
}

impl BatchRunner {
    /// Runner whose requests override `config`'s horizon and country.
    pub fn new(config: ForecastConfig) -> Self {
        Self::with_calendar(config, Arc::new(PublicHolidays::new()))
    }

    pub fn with_calendar(config: ForecastConfig, calendar: Arc<dyn HolidayCalendar>) -> Self {
        Self { config, calendar }
    }

    /// Forecast every requested product.
    ///
    /// Only an invalid request is an error; product failures are reported
    /// in the returned [`BatchReport`].
    pub fn run(
        &self,
        request: &BatchRequest,
        run_id: &str,
        source: &dyn SalesSource,
        sink: &dyn ForecastSink,
    ) -> Result<BatchReport> {
        request.validate()?;

        let mut config = self.config.clone().with_horizon(request.horizon_days);
        config.country = request.country.clone();
        let forecaster = DemandForecaster::with_calendar(config, Arc::clone(&self.calendar))?;

        let products: Vec<ProductReport> = request
            .product_ids
            .par_iter()
            .map(|product_id| {
                let key = ProductKey::new(request.account_id.as_str(), product_id.as_str());
                match self.run_product(&forecaster, &key, request, run_id, source, sink) {
                    Ok(summary) => ProductReport::Completed(summary),
                    Err(e) => {
                        warn!(
                            account_id = %key.account_id,
                            product_id = %key.product_id,
                            error = %e,
                            "product forecast failed"
                        );
                        ProductReport::Failed {
                            product_id: product_id.clone(),
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        let completed = products.iter().filter(|p| p.is_completed()).count();
        info!(
            run_id,
            completed,
            failed = products.len() - completed,
            "batch forecast finished"
        );

        Ok(BatchReport {
            run_id: run_id.to_string(),
            products,
        })
    }

    fn run_product(
        &self,
        forecaster: &DemandForecaster,
        key: &ProductKey,
        request: &BatchRequest,
        run_id: &str,
        source: &dyn SalesSource,
        sink: &dyn ForecastSink,
    ) -> Result<ProductSummary> {
        let records = source.load(key)?;
        let outcome = forecaster.run(&records)?;
        sink.upsert(key, request.country.as_deref(), run_id, &outcome.forecast)?;

        let summary = outcome.summary().ok_or(ForecastError::EmptyInput)?;
        Ok(ProductSummary {
            product_id: key.product_id.clone(),
            horizon_days: request.horizon_days,
            mean: summary.mean,
            p10: summary.p10,
            p90: summary.p90,
        })
    }
}
