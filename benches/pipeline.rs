//! Benchmarks for the ridge fit, the backtest and the full forecast pipeline.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use demand_forecast::calendar::PublicHolidays;
use demand_forecast::config::ForecastConfig;
use demand_forecast::core::{DailySeries, SalesRecord};
use demand_forecast::features::{FeatureBuilder, FeatureConfig};
use demand_forecast::forecaster::DemandForecaster;
use demand_forecast::models::RidgeRegression;
use demand_forecast::utils::{BacktestConfig, Backtester};

fn generate_history(n: usize) -> Vec<SalesRecord> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let weekly = (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin();
            SalesRecord::new(start + Duration::days(i as i64), Some(40.0 + 8.0 * weekly))
                .with_exog("price", 9.0 + (i % 17) as f64 * 0.1)
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ridge_fit");
    let config = FeatureConfig::new().with_exog("price").with_holidays("FR");
    let calendar = PublicHolidays::new();
    let builder = FeatureBuilder::new(&config, &calendar);

    for size in [90, 365, 730, 1460].iter() {
        let series = DailySeries::normalize(&generate_history(*size), &["price".to_string()]).unwrap();
        let (x, y) = builder.training(&series).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", size), size, |b, _| {
            let estimator = RidgeRegression::default();
            b.iter(|| estimator.fit(black_box(&x), black_box(&y)))
        });

        group.bench_with_input(BenchmarkId::new("backtest", size), size, |b, _| {
            let backtester =
                Backtester::new(&builder, RidgeRegression::default(), BacktestConfig::default());
            b.iter(|| backtester.run(black_box(&series)))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast_pipeline");
    let config = ForecastConfig::default().with_exog("price").with_country("FR");
    let forecaster = DemandForecaster::new(config).unwrap();

    for size in [90, 365, 730].iter() {
        let records = generate_history(*size);
        group.bench_with_input(BenchmarkId::new("run", size), size, |b, _| {
            b.iter(|| forecaster.run(black_box(&records)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_pipeline);
criterion_main!(benches);
