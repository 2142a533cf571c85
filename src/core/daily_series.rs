//! Gap-free daily sales series and the normalizer that builds it.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw exogenous value as delivered by a data source.
///
/// Text values are parsed lazily; anything that does not parse to a finite
/// number counts as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExogValue {
    Number(f64),
    Text(String),
    Missing,
}

impl ExogValue {
    /// Coerce to a finite `f64`, or `None` when missing or unparseable.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExogValue::Number(v) if v.is_finite() => Some(*v),
            ExogValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<f64> for ExogValue {
    fn from(value: f64) -> Self {
        ExogValue::Number(value)
    }
}

impl From<Option<f64>> for ExogValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(ExogValue::Missing, ExogValue::Number)
    }
}

impl From<&str> for ExogValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            ExogValue::Missing
        } else {
            ExogValue::Text(value.to_string())
        }
    }
}

/// One raw input row: a calendar day, its observed sales and exogenous values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub exog: BTreeMap<String, ExogValue>,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, target: Option<f64>) -> Self {
        Self {
            date,
            target,
            exog: BTreeMap::new(),
        }
    }

    pub fn with_exog(mut self, name: &str, value: impl Into<ExogValue>) -> Self {
        self.exog.insert(name.to_string(), value.into());
        self
    }
}

/// A named exogenous column aligned with a series' dates.
///
/// `None` only appears before the first observation of the column.
#[derive(Debug, Clone, PartialEq)]
pub struct ExogColumn {
    name: String,
    values: Vec<Option<f64>>,
}

impl ExogColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Last known value of the column, if it was ever observed.
    pub fn last_known(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }
}

/// Anything that carries a date index plus exogenous columns.
///
/// Implemented by historical series and by synthetic future frames so the
/// feature builder treats both identically.
pub trait Covariates {
    fn dates(&self) -> &[NaiveDate];
    fn exog(&self) -> &[ExogColumn];
}

/// A daily series with exactly one row per calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    target: Vec<f64>,
    exog: Vec<ExogColumn>,
}

impl DailySeries {
    /// Reindex raw rows onto a complete daily calendar.
    ///
    /// Days without a row get a zero target; exogenous values are carried
    /// forward from the previous day. Each declared exogenous column must
    /// appear in at least one row.
    pub fn normalize(records: &[SalesRecord], exog_columns: &[String]) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::EmptyInput);
        }

        for name in exog_columns {
            if !records.iter().any(|r| r.exog.contains_key(name)) {
                return Err(ForecastError::InvalidConfiguration(format!(
                    "exogenous column '{}' not present in input",
                    name
                )));
            }
        }

        let mut by_date: BTreeMap<NaiveDate, &SalesRecord> = BTreeMap::new();
        for record in records {
            if by_date.insert(record.date, record).is_some() {
                return Err(ForecastError::DuplicateDate(record.date));
            }
        }

        let (start, end) = match (by_date.keys().next(), by_date.keys().next_back()) {
            (Some(&start), Some(&end)) => (start, end),
            _ => return Err(ForecastError::EmptyInput),
        };
        let n = (end - start).num_days() as usize + 1;

        let mut dates = Vec::with_capacity(n);
        let mut target = Vec::with_capacity(n);
        let mut exog: Vec<ExogColumn> = exog_columns
            .iter()
            .map(|name| ExogColumn::new(name.clone(), Vec::with_capacity(n)))
            .collect();

        for date in start.iter_days().take(n) {
            let record = by_date.get(&date);
            let value = record
                .and_then(|r| r.target)
                .filter(|v| v.is_finite())
                .unwrap_or(0.0);

            dates.push(date);
            target.push(value);

            for column in exog.iter_mut() {
                let observed = record
                    .and_then(|r| r.exog.get(&column.name))
                    .and_then(ExogValue::as_f64);
                let carried = column.values.last().copied().flatten();
                column.values.push(observed.or(carried));
            }
        }

        Ok(Self {
            dates,
            target,
            exog,
        })
    }

    /// Get the number of days.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Daily target values (zero on days without sales).
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn exog_column(&self, name: &str) -> Option<&ExogColumn> {
        self.exog.iter().find(|c| c.name == name)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Sub-series covering rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<DailySeries> {
        if start > end {
            return Err(ForecastError::InvalidConfiguration(format!(
                "slice start {} is after end {}",
                start, end
            )));
        }
        if end > self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: end,
            });
        }

        Ok(DailySeries {
            dates: self.dates[start..end].to_vec(),
            target: self.target[start..end].to_vec(),
            exog: self
                .exog
                .iter()
                .map(|c| ExogColumn::new(c.name.clone(), c.values[start..end].to_vec()))
                .collect(),
        })
    }

    /// The `horizon` days following the last date, with every exogenous
    /// column held at its last known value.
    pub fn future(&self, horizon: usize) -> Result<FutureFrame> {
        let last = self.end_date().ok_or(ForecastError::EmptyInput)?;
        let dates: Vec<NaiveDate> = last.iter_days().skip(1).take(horizon).collect();
        let exog = self
            .exog
            .iter()
            .map(|c| ExogColumn::new(c.name.clone(), vec![c.last_known(); dates.len()]))
            .collect();

        Ok(FutureFrame { dates, exog })
    }

    /// Convert back to raw rows, one per day.
    pub fn to_records(&self) -> Vec<SalesRecord> {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, &date)| {
                self.exog.iter().fold(
                    SalesRecord::new(date, Some(self.target[i])),
                    |record, column| record.with_exog(&column.name, column.values[i]),
                )
            })
            .collect()
    }
}

impl Covariates for DailySeries {
    fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn exog(&self) -> &[ExogColumn] {
        &self.exog
    }
}

/// Synthetic future rows that follow a historical series.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureFrame {
    dates: Vec<NaiveDate>,
    exog: Vec<ExogColumn>,
}

impl FutureFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl Covariates for FutureFrame {
    fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn exog(&self) -> &[ExogColumn] {
        &self.exog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn price() -> Vec<String> {
        vec!["price".to_string()]
    }

    #[test]
    fn normalize_fills_gaps_with_zero_target() {
        let records = vec![
            SalesRecord::new(day(5), Some(3.0)),
            SalesRecord::new(day(1), Some(1.0)),
            SalesRecord::new(day(3), None),
        ];

        let series = DailySeries::normalize(&records, &[]).unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(series.start_date(), Some(day(1)));
        assert_eq!(series.end_date(), Some(day(5)));
        assert_eq!(series.target(), &[1.0, 0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn normalize_forward_fills_exogenous() {
        let records = vec![
            SalesRecord::new(day(1), Some(1.0)),
            SalesRecord::new(day(2), Some(2.0)).with_exog("price", 9.5),
            SalesRecord::new(day(4), Some(4.0)).with_exog("price", ExogValue::Missing),
            SalesRecord::new(day(5), Some(5.0)).with_exog("price", 8.0),
        ];

        let series = DailySeries::normalize(&records, &price()).unwrap();
        let column = series.exog_column("price").unwrap();

        assert_eq!(
            column.values(),
            &[None, Some(9.5), Some(9.5), Some(9.5), Some(8.0)]
        );
    }

    #[test]
    fn unparseable_exogenous_counts_as_missing() {
        let records = vec![
            SalesRecord::new(day(1), Some(1.0)).with_exog("price", "12.5"),
            SalesRecord::new(day(2), Some(1.0)).with_exog("price", "n/a"),
            SalesRecord::new(day(3), Some(1.0)).with_exog("price", f64::NAN),
        ];

        let series = DailySeries::normalize(&records, &price()).unwrap();

        assert_eq!(
            series.exog_column("price").unwrap().values(),
            &[Some(12.5), Some(12.5), Some(12.5)]
        );
    }

    #[test]
    fn normalize_rejects_empty_input() {
        assert_eq!(
            DailySeries::normalize(&[], &[]),
            Err(ForecastError::EmptyInput)
        );
    }

    #[test]
    fn normalize_rejects_duplicate_dates() {
        let records = vec![
            SalesRecord::new(day(1), Some(1.0)),
            SalesRecord::new(day(1), Some(2.0)),
        ];
        assert_eq!(
            DailySeries::normalize(&records, &[]),
            Err(ForecastError::DuplicateDate(day(1)))
        );
    }

    #[test]
    fn normalize_rejects_undeclared_column() {
        let records = vec![SalesRecord::new(day(1), Some(1.0))];
        assert!(matches!(
            DailySeries::normalize(&records, &price()),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn single_row_gives_single_day() {
        let records = vec![SalesRecord::new(day(7), Some(4.0))];
        let series = DailySeries::normalize(&records, &[]).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.start_date(), series.end_date());
    }

    #[test]
    fn normalize_is_idempotent() {
        let records = vec![
            SalesRecord::new(day(2), Some(2.0)),
            SalesRecord::new(day(4), Some(4.0)).with_exog("price", 3.0),
            SalesRecord::new(day(9), None).with_exog("price", 2.0),
        ];
        let once = DailySeries::normalize(&records, &price()).unwrap();
        let twice = DailySeries::normalize(&once.to_records(), &price()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn future_carries_last_known_values() {
        let records = vec![
            SalesRecord::new(day(1), Some(1.0)).with_exog("price", 4.0),
            SalesRecord::new(day(3), Some(1.0)),
        ];
        let series = DailySeries::normalize(&records, &price()).unwrap();
        let future = series.future(3).unwrap();

        assert_eq!(future.dates(), &[day(4), day(5), day(6)]);
        assert_eq!(future.exog()[0].values(), &[Some(4.0); 3]);
    }

    #[test]
    fn slice_keeps_column_alignment() {
        let records: Vec<_> = (1..=6)
            .map(|d| SalesRecord::new(day(d), Some(d as f64)).with_exog("price", d as f64))
            .collect();
        let series = DailySeries::normalize(&records, &price()).unwrap();
        let part = series.slice(2, 5).unwrap();

        assert_eq!(part.target(), &[3.0, 4.0, 5.0]);
        assert_eq!(part.dates()[0], day(3));
        assert_eq!(
            part.exog_column("price").unwrap().values(),
            &[Some(3.0), Some(4.0), Some(5.0)]
        );
        assert!(series.slice(4, 2).is_err());
        assert!(series.slice(0, 7).is_err());
    }
}
