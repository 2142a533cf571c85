//! Core data structures for daily demand forecasting.

mod daily_series;
mod forecast;

pub use daily_series::{Covariates, DailySeries, ExogColumn, ExogValue, FutureFrame, SalesRecord};
pub use forecast::{ForecastPoint, ForecastResult, ForecastSummary};
