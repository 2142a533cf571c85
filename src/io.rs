//! CSV loading of daily sales rows.

use crate::config::ForecastConfig;
use crate::core::{ExogValue, SalesRecord};
use crate::error::{ForecastError, Result};
use crate::service::{ProductKey, SalesSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse a calendar date from `YYYY-MM-DD`, a naive datetime or RFC 3339.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}

/// Read sales rows from CSV with a header row.
///
/// Only the configured date, target and exogenous columns are read; other
/// columns are ignored.
pub fn read_sales_csv<R: Read>(reader: R, config: &ForecastConfig) -> Result<Vec<SalesRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ForecastError::InvalidConfiguration(format!("column '{}' not found in CSV header", name))
        })
    };

    let date_idx = column(&config.date_column)?;
    let target_idx = column(&config.target_column)?;
    let exog_idx = config
        .exog_columns
        .iter()
        .map(|name| column(name).map(|idx| (name.as_str(), idx)))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = row.map_err(|e| {
            if e.is_io_error() {
                ForecastError::from(e)
            } else {
                ForecastError::InvalidData(format!("line {}: {}", line, e))
            }
        })?;

        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| {
            ForecastError::InvalidData(format!("line {}: unparseable date '{}'", line, raw_date))
        })?;

        let raw_target = row.get(target_idx).unwrap_or_default();
        let target = if raw_target.is_empty() {
            None
        } else {
            let value = raw_target.parse::<f64>().ok().filter(|v| v.is_finite());
            Some(value.ok_or_else(|| {
                ForecastError::InvalidData(format!(
                    "line {}: non-numeric {} '{}'",
                    line, config.target_column, raw_target
                ))
            })?)
        };

        let record = exog_idx.iter().fold(SalesRecord::new(date, target), |record, &(name, i)| {
            record.with_exog(name, ExogValue::from(row.get(i).unwrap_or_default()))
        });
        records.push(record);
    }

    debug!(rows = records.len(), "read sales csv");
    Ok(records)
}

/// Read sales rows from a CSV file.
pub fn load_sales_csv(path: impl AsRef<Path>, config: &ForecastConfig) -> Result<Vec<SalesRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ForecastError::Io(format!("failed to open '{}': {}", path.display(), e)))?;
    read_sales_csv(BufReader::new(file), config)
}

/// Sales source backed by one CSV file per product: `<dir>/<product_id>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
    config: ForecastConfig,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>, config: ForecastConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub fn path_for(&self, key: &ProductKey) -> PathBuf {
        self.dir.join(format!("{}.csv", key.product_id))
    }
}

impl SalesSource for CsvSource {
    fn load(&self, key: &ProductKey) -> Result<Vec<SalesRecord>> {
        load_sales_csv(self.path_for(key), &self.config)
    }
}
