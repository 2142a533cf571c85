//! Design matrix construction for the linear demand model.
//!
//! Column order is fixed: `bias`, `wd_0`..`wd_6` (Monday = 0), the declared
//! exogenous columns in declaration order, then `exog_holiday` when a holiday
//! country is configured. Historical and future frames go through the same
//! code path so their columns always line up.

use crate::calendar::HolidayCalendar;
use crate::core::{Covariates, DailySeries, ExogColumn};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Name of the intercept column.
pub const BIAS_COLUMN: &str = "bias";
/// Prefix of the weekday indicator columns.
pub const WEEKDAY_PREFIX: &str = "wd_";
/// Name of the holiday indicator column.
pub const HOLIDAY_COLUMN: &str = "exog_holiday";

/// Which optional columns go into the design matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Exogenous columns, in the order they appear in the matrix.
    #[serde(default)]
    pub exog_columns: Vec<String>,
    /// Country whose public holidays feed the holiday indicator.
    #[serde(default)]
    pub holiday_country: Option<String>,
}

impl FeatureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exog(mut self, name: &str) -> Self {
        self.exog_columns.push(name.to_string());
        self
    }

    pub fn with_holidays(mut self, country: &str) -> Self {
        self.holiday_country = Some(country.to_string());
        self
    }

    /// Column names of every matrix built from this configuration.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(9 + self.exog_columns.len());
        names.push(BIAS_COLUMN.to_string());
        names.extend((0..7).map(|d| format!("{}{}", WEEKDAY_PREFIX, d)));
        names.extend(self.exog_columns.iter().cloned());
        if self.holiday_country.is_some() {
            names.push(HOLIDAY_COLUMN.to_string());
        }
        names
    }

    /// Whether `name` collides with a generated column.
    pub fn is_reserved(name: &str) -> bool {
        name == BIAS_COLUMN
            || name == HOLIDAY_COLUMN
            || name
                .strip_prefix(WEEKDAY_PREFIX)
                .and_then(|d| d.parse::<u8>().ok())
                .is_some_and(|d| d < 7)
    }
}

/// Dense row-major matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    columns: Vec<String>,
    rows: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    pub fn new(columns: Vec<String>, rows: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * columns.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: rows * columns.len(),
                got: data.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let k = self.cols();
        &self.data[i * k..(i + 1) * k]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols() + j]
    }

    /// Copy of column `j`.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Builds design matrices from a feature configuration and a holiday calendar.
pub struct FeatureBuilder<'a> {
    config: &'a FeatureConfig,
    calendar: &'a dyn HolidayCalendar,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(config: &'a FeatureConfig, calendar: &'a dyn HolidayCalendar) -> Self {
        Self { config, calendar }
    }

    /// Design matrix for any dated frame (historical or future).
    pub fn design<C: Covariates + ?Sized>(&self, frame: &C) -> Result<DesignMatrix> {
        let dates = frame.dates();
        let exog = self.resolve_exog(frame.exog(), dates.len())?;
        let holidays = self.holiday_dates(dates);

        let columns = self.config.column_names();
        let k = columns.len();
        let mut data = Vec::with_capacity(dates.len() * k);

        for (i, date) in dates.iter().enumerate() {
            data.push(1.0);
            let weekday = date.weekday().num_days_from_monday();
            data.extend((0..7).map(|d| if d == weekday { 1.0 } else { 0.0 }));
            data.extend(exog.iter().map(|column| column[i]));
            if self.config.holiday_country.is_some() {
                data.push(if holidays.contains(date) { 1.0 } else { 0.0 });
            }
        }

        DesignMatrix::new(columns, dates.len(), data)
    }

    /// Design matrix plus the aligned target vector.
    pub fn training(&self, series: &DailySeries) -> Result<(DesignMatrix, Vec<f64>)> {
        let x = self.design(series)?;
        Ok((x, series.target().to_vec()))
    }

    fn resolve_exog(&self, columns: &[ExogColumn], rows: usize) -> Result<Vec<Vec<f64>>> {
        self.config
            .exog_columns
            .iter()
            .map(|name| {
                let column = columns.iter().find(|c| c.name() == name).ok_or_else(|| {
                    ForecastError::InvalidConfiguration(format!(
                        "exogenous column '{}' missing from frame",
                        name
                    ))
                })?;
                if column.values().len() != rows {
                    return Err(ForecastError::DimensionMismatch {
                        expected: rows,
                        got: column.values().len(),
                    });
                }
                Ok(forward_fill(column.values()))
            })
            .collect()
    }

    fn holiday_dates(&self, dates: &[NaiveDate]) -> BTreeSet<NaiveDate> {
        let Some(country) = self.config.holiday_country.as_deref() else {
            return BTreeSet::new();
        };
        let years: BTreeSet<i32> = dates.iter().map(|d| d.year()).collect();
        let holidays: BTreeSet<NaiveDate> = years
            .into_iter()
            .flat_map(|year| self.calendar.holidays(country, year))
            .collect();
        debug!(country, count = holidays.len(), "resolved holiday calendar");
        holidays
    }
}

/// Carry the last observed value forward; leading gaps become 0.0.
fn forward_fill(values: &[Option<f64>]) -> Vec<f64> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last.unwrap_or(0.0)
        })
        .collect()
}
