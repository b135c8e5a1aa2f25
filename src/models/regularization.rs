//! Elastic Net regression (L1 + L2 regularization)
//!
//! Coordinate descent solver for the objective
//!
//! ```text
//! (1/2n)||y - Xβ - b||² + α * l1_ratio * ||β||₁ + α * (1 - l1_ratio) / 2 * ||β||²
//! ```
//!
//! The intercept `b` is not penalized.

use super::error::{ModelError, ModelResult};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns with a smaller mean square are treated as constant
const MIN_COLUMN_NORM: f64 = 1e-12;

/// Order in which coordinates are updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Sweep the features in column order
    #[default]
    Cyclic,
    /// Sweep a seeded random permutation each iteration
    Random,
}

/// Elastic Net regression fitted with coordinate descent
#[derive(Debug, Clone)]
pub struct ElasticNet {
    /// Overall regularization strength
    alpha: f64,
    /// Balance between L1 and L2 (0 = Ridge, 1 = Lasso)
    l1_ratio: f64,
    /// Maximum iterations
    max_iter: usize,
    /// Convergence tolerance on the relative coefficient update
    tolerance: f64,
    /// Coordinate update order
    selection: Selection,
    /// Seed for random coordinate selection
    seed: u64,
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Intercept
    pub intercept: Option<f64>,
    /// Iterations run by the last fit
    pub n_iter: usize,
}

impl Default for ElasticNet {
    fn default() -> Self {
        Self::new(1.0, 0.5, 1000, 1e-4)
    }
}

impl ElasticNet {
    /// Create a new Elastic Net model
    pub fn new(alpha: f64, l1_ratio: f64, max_iter: usize, tolerance: f64) -> Self {
        Self {
            alpha,
            l1_ratio,
            max_iter,
            tolerance,
            selection: Selection::Cyclic,
            seed: 0,
            coefficients: None,
            intercept: None,
            n_iter: 0,
        }
    }

    /// Set the coordinate update order and the seed used by random selection
    pub fn with_selection(mut self, selection: Selection, seed: u64) -> Self {
        self.selection = selection;
        self.seed = seed;
        self
    }

    /// Fit using coordinate descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<()> {
        if !(self.alpha >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ModelError::InvalidConfig(format!(
                "l1_ratio must be within [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }

        let n_features = x.ncols();
        let (x_mean, y_mean) = match (x.mean_axis(Axis(0)), y.mean()) {
            (Some(xm), Some(ym)) => (xm, ym),
            _ => {
                return Err(ModelError::InsufficientData {
                    rows: 0,
                    features: n_features,
                })
            }
        };

        let n_samples = x.nrows() as f64;
        let x_centered = x - &x_mean;
        let mut residual = y - y_mean;

        let l1_penalty = self.alpha * self.l1_ratio;
        let l2_penalty = self.alpha * (1.0 - self.l1_ratio);

        let column_norms: Vec<f64> = x_centered
            .columns()
            .into_iter()
            .map(|col| col.dot(&col) / n_samples)
            .collect();

        let mut coef = Array1::<f64>::zeros(n_features);
        let mut order: Vec<usize> = (0..n_features).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.n_iter = 0;
        for iter in 0..self.max_iter {
            if self.selection == Selection::Random {
                order.shuffle(&mut rng);
            }

            let mut max_update: f64 = 0.0;
            let mut max_coef: f64 = 0.0;

            for &j in &order {
                if column_norms[j] < MIN_COLUMN_NORM {
                    continue;
                }

                let column = x_centered.column(j);
                let old = coef[j];

                // Correlation with the partial residual that excludes feature j
                let rho = column.dot(&residual) / n_samples + column_norms[j] * old;
                let new = soft_threshold(rho, l1_penalty) / (column_norms[j] + l2_penalty);

                if new != old {
                    residual.scaled_add(old - new, &column);
                    coef[j] = new;
                }

                max_update = max_update.max((new - old).abs());
                max_coef = max_coef.max(new.abs());
            }

            self.n_iter = iter + 1;

            if max_coef == 0.0 || max_update / max_coef < self.tolerance {
                debug!(
                    "Coordinate descent converged after {} iterations",
                    self.n_iter
                );
                break;
            }
        }

        if self.n_iter == self.max_iter {
            debug!(
                "Coordinate descent stopped at max_iter={} before reaching tolerance {}",
                self.max_iter, self.tolerance
            );
        }

        self.intercept = Some(y_mean - x_mean.dot(&coef));
        self.coefficients = Some(coef);

        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> ModelResult<Array1<f64>> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        let intercept = self.intercept.ok_or(ModelError::NotFitted)?;

        if x.ncols() != coef.len() {
            return Err(ModelError::DimensionMismatch {
                expected: coef.len(),
                got: x.ncols(),
            });
        }

        Ok(x.dot(coef) + intercept)
    }

    /// Get number of non-zero coefficients
    pub fn n_nonzero(&self) -> usize {
        self.coefficients
            .as_ref()
            .map(|c| c.iter().filter(|&&v| v != 0.0).count())
            .unwrap_or(0)
    }
}

/// Soft thresholding operator
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_unregularized_recovers_line() {
        // y = 2 + 3x
        let x = Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let y = Array1::from_vec(vec![5.0, 8.0, 11.0, 14.0, 17.0]);

        let mut model = ElasticNet::new(0.0, 0.5, 1000, 1e-10);
        model.fit(&x, &y).unwrap();

        assert!((model.coefficients.as_ref().unwrap()[0] - 3.0).abs() < 1e-8);
        assert!((model.intercept.unwrap() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_closed_form_single_feature() {
        // Standardized x = [-1, 1], centered y = [-50, 50]:
        // β = S(50, α·r) / (1 + α·(1 - r))
        let x = Array2::from_shape_vec((2, 1), vec![-1.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![100.0, 200.0]);

        let mut model = ElasticNet::new(0.05, 0.2, 1000, 1e-8);
        model.fit(&x, &y).unwrap();

        let expected = (50.0 - 0.01) / (1.0 + 0.04);
        let coef = model.coefficients.as_ref().unwrap()[0];
        assert!((coef - expected).abs() < 1e-9);
        assert!((model.intercept.unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_strong_l1_zeroes_coefficients() {
        let x = Array2::from_shape_vec((4, 2), vec![1.0, 0.0, 2.0, 1.0, 3.0, 0.0, 4.0, 1.0])
            .unwrap();
        let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);

        let mut model = ElasticNet::new(100.0, 1.0, 1000, 1e-6);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.n_nonzero(), 0);
        assert!((model.intercept.unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_gets_zero_coefficient() {
        let x = Array2::from_shape_vec((4, 2), vec![1.0, 7.0, 2.0, 7.0, 3.0, 7.0, 4.0, 7.0])
            .unwrap();
        let y = Array1::from_vec(vec![2.0, 4.0, 6.0, 8.0]);

        let mut model = ElasticNet::new(0.01, 0.5, 1000, 1e-8);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert_eq!(coef[1], 0.0);
        assert!(coef[0] > 1.5);
    }

    #[test]
    fn test_random_selection_is_reproducible() {
        let x = Array2::from_shape_vec(
            (6, 3),
            vec![
                1.0, 0.5, 2.0, 2.0, 0.1, 1.0, 3.0, 0.9, 0.0, 4.0, 0.3, 1.5, 5.0, 0.7, 0.2, 6.0,
                0.2, 1.1,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![3.0, 4.5, 6.1, 8.2, 9.9, 12.3]);

        let mut a = ElasticNet::new(0.1, 0.3, 1000, 1e-6).with_selection(Selection::Random, 42);
        let mut b = ElasticNet::new(0.1, 0.3, 1000, 1e-6).with_selection(Selection::Random, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.intercept, b.intercept);
    }

    #[test]
    fn test_invalid_parameters() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 2.0]);

        assert!(matches!(
            ElasticNet::new(-1.0, 0.5, 10, 1e-4).fit(&x, &y),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            ElasticNet::new(0.1, 1.5, 10, 1e-4).fit(&x, &y),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_predict_requires_fit() {
        let model = ElasticNet::default();
        let x = Array2::zeros((1, 1));
        assert!(matches!(model.predict(&x), Err(ModelError::NotFitted)));
    }
}
