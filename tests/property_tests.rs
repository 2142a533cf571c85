//! Property-based tests for normalization, feature building and backtests.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated daily histories.

use chrono::{Duration, NaiveDate};
use demand_forecast::calendar::PublicHolidays;
use demand_forecast::core::{DailySeries, SalesRecord};
use demand_forecast::features::{FeatureBuilder, FeatureConfig};
use demand_forecast::models::RidgeRegression;
use demand_forecast::utils::metrics::wmape;
use demand_forecast::utils::BacktestConfig;
use demand_forecast::ForecastError;
use proptest::prelude::*;
use std::collections::BTreeMap;

const EXOG: [&str; 3] = ["price", "stock", "promo"];

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 20).unwrap()
}

/// Strategy for sparse histories: distinct day offsets with optional sales
/// and optional exogenous values.
fn sparse_history(max_days: u32) -> impl Strategy<Value = Vec<SalesRecord>> {
    prop::collection::btree_map(
        0..max_days,
        (
            prop::option::of(0.0..500.0_f64),
            prop::option::of(1.0..20.0_f64),
            prop::option::of(0.0..100.0_f64),
        ),
        1..60,
    )
    .prop_map(|days: BTreeMap<u32, (Option<f64>, Option<f64>, Option<f64>)>| {
        days.into_iter()
            .map(|(offset, (sales, price, stock))| {
                SalesRecord::new(base() + Duration::days(offset as i64), sales)
                    .with_exog("price", price)
                    .with_exog("stock", stock)
                    .with_exog("promo", if offset % 5 == 0 { "1" } else { "0" })
            })
            .collect()
    })
}

fn exog_names(count: usize) -> Vec<String> {
    EXOG.iter().take(count).map(|s| s.to_string()).collect()
}

// =============================================================================
// Property: normalized series hold exactly one row per day
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalized_series_has_one_row_per_day(records in sparse_history(120)) {
        let series = DailySeries::normalize(&records, &exog_names(2)).unwrap();

        let first = records.iter().map(|r| r.date).min().unwrap();
        let last = records.iter().map(|r| r.date).max().unwrap();
        prop_assert_eq!(series.len() as i64, (last - first).num_days() + 1);
        prop_assert_eq!(series.start_date(), Some(first));
        prop_assert_eq!(series.end_date(), Some(last));
        prop_assert!(series.target().iter().all(|v| v.is_finite()));

        for record in &records {
            let i = (record.date - first).num_days() as usize;
            prop_assert_eq!(series.target()[i], record.target.unwrap_or(0.0));
        }
    }

    #[test]
    fn normalization_is_idempotent(records in sparse_history(90)) {
        let names = exog_names(3);
        let once = DailySeries::normalize(&records, &names).unwrap();
        let twice = DailySeries::normalize(&once.to_records(), &names).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// Property: feature building is deterministic and column-stable
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn design_matrix_is_deterministic(
        records in sparse_history(120),
        exog_count in 0usize..=3,
        with_holidays in any::<bool>()
    ) {
        let names = exog_names(exog_count);
        let series = DailySeries::normalize(&records, &names).unwrap();
        let mut config = FeatureConfig::new();
        for name in &names {
            config = config.with_exog(name);
        }
        if with_holidays {
            config = config.with_holidays("DE");
        }
        let calendar = PublicHolidays::new();
        let builder = FeatureBuilder::new(&config, &calendar);

        let a = builder.design(&series).unwrap();
        let b = builder.design(&series).unwrap();
        prop_assert_eq!(a.column_names(), b.column_names());
        let bits_a: Vec<u64> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn future_columns_match_training_columns(
        records in sparse_history(120),
        exog_count in 0usize..=3,
        country in prop::sample::select(vec!["", "FR", "US", "GB", "ZZ"]),
        horizon in 1usize..=90
    ) {
        let names = exog_names(exog_count);
        let series = DailySeries::normalize(&records, &names).unwrap();
        let mut config = FeatureConfig::new();
        for name in &names {
            config = config.with_exog(name);
        }
        if !country.is_empty() {
            config = config.with_holidays(country);
        }
        let calendar = PublicHolidays::new();
        let builder = FeatureBuilder::new(&config, &calendar);

        let (train, _) = builder.training(&series).unwrap();
        let future = builder.design(&series.future(horizon).unwrap()).unwrap();

        prop_assert_eq!(train.column_names(), future.column_names());
        prop_assert_eq!(future.rows(), horizon);
        for i in 0..future.rows() {
            let weekdays: f64 = future.row(i)[1..8].iter().sum();
            prop_assert_eq!(weekdays, 1.0);
        }
    }

    #[test]
    fn fitted_predictions_are_finite(records in sparse_history(120)) {
        let names = exog_names(3);
        let series = DailySeries::normalize(&records, &names).unwrap();
        let config = FeatureConfig::new().with_exog("price").with_exog("stock").with_exog("promo");
        let calendar = PublicHolidays::new();
        let builder = FeatureBuilder::new(&config, &calendar);
        let (x, y) = builder.training(&series).unwrap();

        let model = RidgeRegression::default().fit(&x, &y).unwrap();
        prop_assert!(model.sigma().is_finite() && model.sigma() >= 0.0);
        let predictions = model.predict(&x).unwrap();
        prop_assert!(predictions.iter().all(|v| v.is_finite()));
    }
}

// =============================================================================
// Property: accuracy metrics and backtest windows
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn wmape_is_non_negative(
        pairs in prop::collection::vec((-100.0..100.0_f64, -100.0..100.0_f64), 1..50)
    ) {
        let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        prop_assert!(wmape(&actual, &predicted) >= 0.0);
        prop_assert_eq!(wmape(&actual, &actual), 0.0);
    }

    #[test]
    fn backtest_windows_respect_minimum_history(
        folds in 1usize..6,
        horizon in 1usize..20,
        extra in 0usize..100
    ) {
        let config = BacktestConfig::new(folds, horizon);
        let needed = horizon * (folds + 1);

        prop_assert_eq!(
            config.windows(needed - 1),
            Err(ForecastError::InsufficientHistory { needed, got: needed - 1 })
        );

        let n = needed + extra;
        let windows = config.windows(n).unwrap();
        prop_assert_eq!(windows.len(), folds);
        prop_assert_eq!(windows[folds - 1].test_end, n);
        for window in &windows {
            prop_assert_eq!(window.test_end - window.test_start, horizon);
            prop_assert!(window.test_start >= horizon);
        }
        for pair in windows.windows(2) {
            prop_assert!(pair[0].test_end <= pair[1].test_start);
        }
    }
}
