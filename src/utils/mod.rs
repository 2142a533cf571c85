//! Evaluation and statistics helpers.

pub mod backtest;
pub mod metrics;
pub mod stats;

pub use backtest::{BacktestConfig, BacktestMetrics, Backtester, FoldResult, FoldWindow};
pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use stats::Z_P90;
