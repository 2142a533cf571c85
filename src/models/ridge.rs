//! Closed-form ridge regression.
//!
//! Solves `(XᵀX + l2·I) β = Xᵀy` by Cholesky factorisation. The penalty keeps
//! the system positive definite even though the bias column equals the sum of
//! the weekday indicators. If Cholesky still breaks down numerically, Gaussian
//! elimination with partial pivoting is tried before giving up.

use crate::error::{ForecastError, Result};
use crate::features::DesignMatrix;
use crate::utils::stats::population_std;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default ridge penalty.
pub const DEFAULT_L2: f64 = 1e-3;

/// Relative pivot tolerance below which a system is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-14;

/// Ridge estimator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeRegression {
    l2: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self { l2: DEFAULT_L2 }
    }
}

impl RidgeRegression {
    /// Create an estimator with penalty `l2` (0 gives plain least squares).
    pub fn new(l2: f64) -> Result<Self> {
        if !l2.is_finite() || l2 < 0.0 {
            return Err(ForecastError::InvalidConfiguration(format!(
                "l2 penalty must be a finite non-negative number, got {}",
                l2
            )));
        }
        Ok(Self { l2 })
    }

    pub fn l2(&self) -> f64 {
        self.l2
    }

    /// Fit coefficients and the in-sample residual spread.
    pub fn fit(&self, x: &DesignMatrix, y: &[f64]) -> Result<FittedModel> {
        let n = x.rows();
        let k = x.cols();

        if n == 0 {
            return Err(ForecastError::EmptyInput);
        }
        if y.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }
        if n < k {
            debug!(rows = n, cols = k, "fewer rows than columns, relying on penalty");
        }

        let (mut xtx, xty) = normal_equations(x, y);
        for (i, row) in xtx.iter_mut().enumerate() {
            row[i] += self.l2;
        }

        let coefficients = solve_symmetric(&xtx, &xty)
            .or_else(|| solve_gaussian(&xtx, &xty))
            .ok_or_else(|| {
                ForecastError::SingularSystem(format!(
                    "normal equations of a {}x{} design are not solvable with l2={}",
                    n, k, self.l2
                ))
            })?;

        let fitted = predict(x, &coefficients)?;
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();
        let sigma = population_std(&residuals);

        debug!(rows = n, cols = k, l2 = self.l2, sigma, "fitted ridge model");

        Ok(FittedModel {
            feature_names: x.column_names().to_vec(),
            coefficients,
            sigma,
            n_obs: n,
        })
    }
}

/// Coefficients fitted on one design matrix. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredModel")]
pub struct FittedModel {
    #[serde(rename = "features")]
    feature_names: Vec<String>,
    #[serde(rename = "coef")]
    coefficients: Vec<f64>,
    sigma: f64,
    n_obs: usize,
}

impl FittedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Coefficient of a named feature.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|f| f == name)
            .and_then(|i| self.coefficients.get(i).copied())
    }

    /// Standard deviation of the in-sample residuals.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Number of rows the model was fitted on.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Predict for a matrix whose columns match the training columns.
    pub fn predict(&self, x: &DesignMatrix) -> Result<Vec<f64>> {
        if x.column_names() != self.feature_names.as_slice() {
            return Err(ForecastError::InvalidConfiguration(format!(
                "design columns {:?} do not match model features {:?}",
                x.column_names(),
                self.feature_names
            )));
        }
        predict(x, &self.coefficients)
    }
}

/// Serialized form of [`FittedModel`], checked before use.
#[derive(Deserialize)]
struct StoredModel {
    features: Vec<String>,
    coef: Vec<f64>,
    sigma: f64,
    n_obs: usize,
}

impl TryFrom<StoredModel> for FittedModel {
    type Error = ForecastError;

    fn try_from(stored: StoredModel) -> Result<Self> {
        if stored.features.len() != stored.coef.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: stored.features.len(),
                got: stored.coef.len(),
            });
        }
        if !stored.sigma.is_finite() || stored.sigma < 0.0 {
            return Err(ForecastError::InvalidData(format!("invalid sigma {}", stored.sigma)));
        }
        Ok(Self {
            feature_names: stored.features,
            coefficients: stored.coef,
            sigma: stored.sigma,
            n_obs: stored.n_obs,
        })
    }
}

/// Linear prediction `X · coef`.
pub fn predict(x: &DesignMatrix, coef: &[f64]) -> Result<Vec<f64>> {
    if coef.len() != x.cols() {
        return Err(ForecastError::DimensionMismatch {
            expected: x.cols(),
            got: coef.len(),
        });
    }

    Ok((0..x.rows())
        .map(|i| x.row(i).iter().zip(coef).map(|(a, b)| a * b).sum())
        .collect())
}

/// Build XᵀX and Xᵀy.
fn normal_equations(x: &DesignMatrix, y: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let k = x.cols();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for (obs, &y_obs) in y.iter().enumerate() {
        let row = x.row(obs);
        for i in 0..k {
            let xi = row[i];
            if xi == 0.0 {
                continue;
            }
            for j in i..k {
                xtx[i][j] += xi * row[j];
            }
            xty[i] += xi * y_obs;
        }
    }

    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    (xtx, xty)
}

/// Solve a symmetric positive definite system via Cholesky decomposition.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= PIVOT_TOLERANCE * a[i][i].abs() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// Gaussian elimination with partial pivoting.
fn solve_gaussian(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return None;
    }

    let mut m: Vec<Vec<f64>> = a.to_vec();
    let mut rhs = b.to_vec();

    for col in 0..n {
        let pivot = (col..n).max_by(|&p, &q| m[p][col].abs().total_cmp(&m[q][col].abs()))?;
        if m[pivot][col].abs() <= PIVOT_TOLERANCE * scale {
            return None;
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum -= m[i][j] * x[j];
        }
        x[i] = sum / m[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix(columns: &[&str], rows: &[&[f64]]) -> DesignMatrix {
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        DesignMatrix::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.len(),
            data,
        )
        .unwrap()
    }

    #[test]
    fn ridge_recovers_linear_relation() {
        // y = 2 + 3*x
        let x = matrix(
            &["bias", "x"],
            &[&[1.0, 1.0], &[1.0, 2.0], &[1.0, 3.0], &[1.0, 4.0], &[1.0, 5.0]],
        );
        let y = vec![5.0, 8.0, 11.0, 14.0, 17.0];

        let model = RidgeRegression::new(1e-8).unwrap().fit(&x, &y).unwrap();

        assert_relative_eq!(model.coefficient("bias").unwrap(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(model.coefficient("x").unwrap(), 3.0, epsilon = 1e-5);
        assert!(model.sigma() < 1e-5);
        assert_eq!(model.n_obs(), 5);
    }

    #[test]
    fn penalty_handles_collinear_columns() {
        // Bias equals the sum of the two indicators.
        let x = matrix(
            &["bias", "a", "b"],
            &[&[1.0, 1.0, 0.0], &[1.0, 0.0, 1.0], &[1.0, 1.0, 0.0], &[1.0, 0.0, 1.0]],
        );
        let y = vec![4.0, 2.0, 4.0, 2.0];

        let model = RidgeRegression::default().fit(&x, &y).unwrap();
        let fitted = model.predict(&x).unwrap();

        for (f, a) in fitted.iter().zip(&y) {
            assert_relative_eq!(*f, *a, epsilon = 1e-2);
        }
    }

    #[test]
    fn zero_penalty_on_duplicate_columns_is_singular() {
        let x = matrix(&["a", "b"], &[&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]]);
        let y = vec![1.0, 2.0, 3.0];

        let result = RidgeRegression::new(0.0).unwrap().fit(&x, &y);
        assert!(matches!(result, Err(ForecastError::SingularSystem(_))));
    }

    #[test]
    fn sigma_is_residual_standard_deviation() {
        let x = matrix(
            &["bias", "x"],
            &[&[1.0, 0.0], &[1.0, 1.0], &[1.0, 2.0], &[1.0, 3.0], &[1.0, 4.0], &[1.0, 5.0]],
        );
        let y = vec![1.0, 2.5, 2.9, 4.2, 4.8, 6.3];

        let model = RidgeRegression::default().fit(&x, &y).unwrap();
        let fitted = model.predict(&x).unwrap();
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();
        let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
        let variance =
            residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / residuals.len() as f64;

        assert_relative_eq!(model.sigma().powi(2), variance, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_fallback_matches_cholesky() {
        let a = vec![
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.2],
            vec![0.5, 0.2, 2.0],
        ];
        let b = vec![1.0, 2.0, 3.0];

        let chol = solve_symmetric(&a, &b).unwrap();
        let gauss = solve_gaussian(&a, &b).unwrap();
        for (c, g) in chol.iter().zip(&gauss) {
            assert_relative_eq!(*c, *g, epsilon = 1e-12);
        }
    }

    #[test]
    fn fit_validates_shapes() {
        let x = matrix(&["bias"], &[&[1.0], &[1.0]]);
        assert!(matches!(
            RidgeRegression::default().fit(&x, &[1.0]),
            Err(ForecastError::DimensionMismatch { expected: 2, got: 1 })
        ));

        let empty = DesignMatrix::new(vec!["bias".to_string()], 0, vec![]).unwrap();
        assert_eq!(
            RidgeRegression::default().fit(&empty, &[]),
            Err(ForecastError::EmptyInput)
        );

        assert!(RidgeRegression::new(-1.0).is_err());
        assert!(RidgeRegression::new(f64::NAN).is_err());
    }

    #[test]
    fn predict_rejects_foreign_columns() {
        let x = matrix(&["bias", "x"], &[&[1.0, 1.0], &[1.0, 2.0], &[1.0, 3.0]]);
        let model = RidgeRegression::default().fit(&x, &[1.0, 2.0, 3.0]).unwrap();

        let other = matrix(&["bias", "z"], &[&[1.0, 4.0]]);
        assert!(matches!(
            model.predict(&other),
            Err(ForecastError::InvalidConfiguration(_))
        ));
        assert!(predict(&other, &[1.0]).is_err());
    }

    #[test]
    fn model_serializes_with_short_keys() {
        let x = matrix(&["bias"], &[&[1.0], &[1.0]]);
        let model = RidgeRegression::default().fit(&x, &[2.0, 2.0]).unwrap();
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["features"][0], "bias");
        assert!(json["coef"][0].as_f64().is_some());
        assert!(json["sigma"].as_f64().is_some());
    }

    #[test]
    fn stored_model_is_checked_on_load() {
        let x = matrix(&["bias"], &[&[1.0], &[1.0]]);
        let model = RidgeRegression::default().fit(&x, &[2.0, 2.0]).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.feature_names(), model.feature_names());

        let short = r#"{"features":["bias","wd_0"],"coef":[1.0],"sigma":0.5,"n_obs":10}"#;
        assert!(serde_json::from_str::<FittedModel>(short).is_err());

        let negative = r#"{"features":["bias"],"coef":[1.0],"sigma":-1.0,"n_obs":10}"#;
        assert!(serde_json::from_str::<FittedModel>(negative).is_err());
    }
}
