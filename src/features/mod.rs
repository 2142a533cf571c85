//! Feature engineering for the daily demand model.
//!
//! # Example
//!
//! ```
//! use demand_forecast::calendar::PublicHolidays;
//! use demand_forecast::core::{DailySeries, SalesRecord};
//! use demand_forecast::features::{FeatureBuilder, FeatureConfig};
//! use chrono::NaiveDate;
//!
//! let records: Vec<_> = (1..=14)
//!     .map(|d| {
//!         SalesRecord::new(NaiveDate::from_ymd_opt(2025, 7, d).unwrap(), Some(d as f64))
//!             .with_exog("price", 9.99)
//!     })
//!     .collect();
//! let series = DailySeries::normalize(&records, &["price".to_string()]).unwrap();
//!
//! let config = FeatureConfig::new().with_exog("price").with_holidays("FR");
//! let builder = FeatureBuilder::new(&config, &PublicHolidays);
//! let (x, y) = builder.training(&series).unwrap();
//!
//! assert_eq!(x.cols(), 10);
//! assert_eq!(y.len(), 14);
//! ```

pub mod design;

pub use design::{
    DesignMatrix, FeatureBuilder, FeatureConfig, BIAS_COLUMN, HOLIDAY_COLUMN, WEEKDAY_PREFIX,
};
