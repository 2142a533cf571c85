//! Error types for the demand-forecast library.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while normalizing, fitting or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// No rows to build a daily index from.
    #[error("empty input: no rows to normalize")]
    EmptyInput,

    /// Not enough history for the requested backtest folds and horizon.
    #[error("insufficient history: need at least {needed} days, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// The ridge normal equations could not be solved.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// Configuration references unknown columns or is out of bounds.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Two input rows share the same calendar date.
    #[error("duplicate date in input: {0}")]
    DuplicateDate(NaiveDate),

    /// An input row could not be parsed.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}
