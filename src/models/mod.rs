//! Regression models.

pub mod ridge;

pub use ridge::{predict, FittedModel, RidgeRegression, DEFAULT_L2};
