//! Data processing utilities for preparing regression datasets
//!
//! Provides the standard scaler used by the profit pipeline and a seeded
//! shuffled train/holdout split.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as zero variance
const MIN_SCALE: f64 = 1e-10;

/// Per-column standardization parameters: z = (x - mean) / scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means of the fitting data
    pub mean: Array1<f64>,
    /// Column population standard deviations, 1.0 for constant columns
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit the scaler on a feature matrix (n_samples x n_features)
    ///
    /// Returns `None` for a matrix without rows.
    pub fn fit(x: &Array2<f64>) -> Option<Self> {
        let mean = x.mean_axis(Axis(0))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_SCALE { 1.0 } else { s });

        Some(Self { mean, scale })
    }

    /// Number of columns the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize a matrix with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

/// Shuffled train/holdout split over row indices
///
/// The holdout takes `ceil(n * test_size)` rows; the shuffle is driven by
/// a `StdRng` seeded with `seed`, so the split is reproducible.
pub fn shuffled_split(n_samples: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64) * test_size.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = n_test.min(n_samples);

    let train = indices[n_test..].to_vec();
    let test = indices[..n_test].to_vec();

    (train, test)
}

/// Select rows of a feature matrix and target vector
pub fn take_rows(x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}
