//! Regression metrics for evaluating profit predictions

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by metric computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Degenerate targets: {distinct} distinct value(s), at least 2 required for R²")]
    DegenerateInput { distinct: usize },

    #[error("Length mismatch: {targets} targets, {predictions} predictions")]
    LengthMismatch { targets: usize, predictions: usize },
}

/// Goodness-of-fit summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// R-squared (coefficient of determination)
    pub r_squared: f64,
    /// Mean Absolute Error
    pub mean_absolute_error: f64,
    /// Number of samples evaluated
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Evaluate predictions against targets
    ///
    /// Fails when targets have fewer than two distinct values, since the
    /// R² denominator would be zero.
    pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self, MetricsError> {
        if y_true.len() != y_pred.len() {
            return Err(MetricsError::LengthMismatch {
                targets: y_true.len(),
                predictions: y_pred.len(),
            });
        }

        let distinct = Self::distinct_values(y_true);
        if distinct < 2 {
            return Err(MetricsError::DegenerateInput { distinct });
        }

        Ok(Self {
            r_squared: Self::r_squared(y_true, y_pred),
            mean_absolute_error: Self::mean_absolute_error(y_true, y_pred),
            n_samples: y_true.len(),
        })
    }

    /// Mean Absolute Error: (1/n) * Σ|y_true - y_pred|
    pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let n = y_true.len() as f64;
        y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).abs())
            .sum::<f64>()
            / n
    }

    /// R² = 1 - SS_res / SS_tot
    pub fn r_squared(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let y_mean = y_true.mean().unwrap_or(0.0);

        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();

        let ss_tot: f64 = y_true.iter().map(|&t| (t - y_mean).powi(2)).sum();

        1.0 - ss_res / ss_tot
    }

    fn distinct_values(values: &Array1<f64>) -> usize {
        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        sorted.len()
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        let mut s = String::new();
        s.push_str("Regression Metrics Report\n");
        s.push_str("=========================\n\n");
        s.push_str(&format!("Samples:  {}\n", self.n_samples));
        s.push_str(&format!("R²:       {:.6}\n", self.r_squared));
        s.push_str(&format!("MAE:      {:.6}\n", self.mean_absolute_error));
        s
    }
}

/// Evaluate predictions against targets
pub fn evaluate(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> Result<RegressionMetrics, MetricsError> {
    RegressionMetrics::evaluate(y_true, y_pred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let metrics = evaluate(&y, &y).unwrap();

        assert_eq!(metrics.r_squared, 1.0);
        assert_eq!(metrics.mean_absolute_error, 0.0);
        assert_eq!(metrics.n_samples, 5);
    }

    #[test]
    fn test_known_values() {
        let y_true = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let y_pred = Array1::from_vec(vec![2.0, 2.0, 2.0]);
        let metrics = evaluate(&y_true, &y_pred).unwrap();

        // SS_res = 2, SS_tot = 2
        assert!(metrics.r_squared.abs() < 1e-12);
        assert!((metrics.mean_absolute_error - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_targets_are_degenerate() {
        let y_true = Array1::from_vec(vec![7.0, 7.0, 7.0]);
        let y_pred = Array1::from_vec(vec![6.0, 7.0, 8.0]);

        assert_eq!(
            evaluate(&y_true, &y_pred),
            Err(MetricsError::DegenerateInput { distinct: 1 })
        );
    }

    #[test]
    fn test_empty_targets_are_degenerate() {
        let empty = Array1::<f64>::zeros(0);
        assert_eq!(
            evaluate(&empty, &empty),
            Err(MetricsError::DegenerateInput { distinct: 0 })
        );
    }

    #[test]
    fn test_length_mismatch() {
        let y_true = Array1::from_vec(vec![1.0, 2.0]);
        let y_pred = Array1::from_vec(vec![1.0]);

        assert!(matches!(
            evaluate(&y_true, &y_pred),
            Err(MetricsError::LengthMismatch { .. })
        ));
    }
}
