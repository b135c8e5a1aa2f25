//! Standardize-then-regress profit pipeline
//!
//! [`ProfitPipeline`] fits a [`StandardScaler`] and an [`ElasticNet`] on
//! the configured feature columns and produces an immutable
//! [`FittedModel`]. Prediction always reuses the training statistics.

use super::error::{ModelError, ModelResult};
use super::regularization::{ElasticNet, Selection};
use crate::data::features::{design_matrix, feature_matrix};
use crate::data::processor::StandardScaler;
use crate::data::types::{FeatureColumn, FeatureRecord, TrainingFeatureRecord};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Version of the serialized model layout
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Pipeline hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Overall regularization strength
    pub alpha: f64,
    /// Share of the L1 penalty (0 = Ridge, 1 = Lasso)
    pub l1_ratio: f64,
    /// Maximum coordinate descent iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tolerance: f64,
    /// Seed for random coordinate selection
    pub seed: u64,
    /// Coordinate update order
    pub selection: Selection,
    /// Model input columns, in matrix order
    pub features: Vec<FeatureColumn>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            l1_ratio: 0.20,
            max_iter: 1000,
            tolerance: 1e-4,
            seed: 42,
            selection: Selection::Cyclic,
            features: FeatureColumn::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Set regularization strength
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the L1/L2 mix
    pub fn l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    /// Set the iteration limit
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the coordinate update order
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Restrict the model to a subset of columns
    pub fn features(mut self, features: Vec<FeatureColumn>) -> Self {
        self.features = features;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ModelError::InvalidConfig(format!(
                "l1_ratio must be within [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidConfig(
                "max_iter must be positive".into(),
            ));
        }
        if self.features.is_empty() {
            return Err(ModelError::InvalidConfig("feature list is empty".into()));
        }
        Ok(())
    }
}

/// Unfitted pipeline: configuration only
#[derive(Debug, Clone, Default)]
pub struct ProfitPipeline {
    config: PipelineConfig,
}

impl ProfitPipeline {
    /// Create a pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Fit on labeled feature records
    pub fn fit(&self, records: &[TrainingFeatureRecord]) -> ModelResult<FittedModel> {
        let (x, y) = design_matrix(records, &self.config.features);
        self.fit_matrix(&x, &y)
    }

    /// Fit on a feature matrix whose columns follow `config.features`
    pub fn fit_matrix(&self, x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<FittedModel> {
        self.config.validate()?;

        let n_features = self.config.features.len();
        if x.ncols() != n_features {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                got: x.ncols(),
            });
        }
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if x.nrows() < n_features {
            return Err(ModelError::InsufficientData {
                rows: x.nrows(),
                features: n_features,
            });
        }

        let scaler = StandardScaler::fit(x).ok_or(ModelError::InsufficientData {
            rows: 0,
            features: n_features,
        })?;
        let z = scaler.transform(x);

        let mut regression = ElasticNet::new(
            self.config.alpha,
            self.config.l1_ratio,
            self.config.max_iter,
            self.config.tolerance,
        )
        .with_selection(self.config.selection, self.config.seed);
        regression.fit(&z, y)?;

        info!(
            "Fitted elastic net on {} rows x {} columns ({} non-zero coefficients, {} iterations)",
            x.nrows(),
            n_features,
            regression.n_nonzero(),
            regression.n_iter
        );

        let coefficients = regression.coefficients.take().ok_or(ModelError::NotFitted)?;
        let intercept = regression.intercept.ok_or(ModelError::NotFitted)?;

        Ok(FittedModel {
            format_version: MODEL_FORMAT_VERSION,
            trained_at: Utc::now(),
            n_training_rows: x.nrows(),
            config: self.config.clone(),
            scaler,
            coefficients,
            intercept,
        })
    }
}

/// Coefficient of a single feature in standardized space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Trained pipeline: scaler statistics plus regression weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    format_version: u32,
    trained_at: DateTime<Utc>,
    n_training_rows: usize,
    config: PipelineConfig,
    scaler: StandardScaler,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl FittedModel {
    /// Feature columns in model order
    pub fn features(&self) -> &[FeatureColumn] {
        &self.config.features
    }

    /// Configuration the model was trained with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fitted standardization parameters
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Coefficients in standardized-feature space
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Intercept term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Number of rows the model was fitted on
    pub fn n_training_rows(&self) -> usize {
        self.n_training_rows
    }

    /// Time of fitting
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Predict profit for feature records
    pub fn predict(&self, records: &[FeatureRecord]) -> ModelResult<Array1<f64>> {
        let x = feature_matrix(records, &self.config.features);
        self.predict_matrix(&x)
    }

    /// Predict from a raw feature matrix in model column order
    pub fn predict_matrix(&self, x: &Array2<f64>) -> ModelResult<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }

        let z = self.scaler.transform(x);
        Ok(z.dot(&self.coefficients) + self.intercept)
    }

    /// Coefficients keyed by feature name, in model column order
    pub fn feature_importance(&self) -> Vec<FeatureImportance> {
        self.config
            .features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.name().to_string(),
                importance,
            })
            .collect()
    }

    /// Feature importance sorted by descending absolute coefficient
    pub fn ranked_importance(&self) -> Vec<FeatureImportance> {
        let mut importance = self.feature_importance();
        importance.sort_by(|a, b| b.importance.abs().total_cmp(&a.importance.abs()));
        importance
    }

    /// Model summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("Elastic Net Profit Model\n");
        s.push_str("========================\n\n");
        s.push_str(&format!(
            "Trained at: {}\n",
            self.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        s.push_str(&format!(
            "alpha: {}  l1_ratio: {}  rows: {}\n",
            self.config.alpha, self.config.l1_ratio, self.n_training_rows
        ));
        s.push_str(&format!("Intercept: {:.6}\n\n", self.intercept));
        s.push_str("Standardized coefficients (* = derived):\n");

        let mut ranked: Vec<(FeatureColumn, f64)> = self
            .config
            .features
            .iter()
            .copied()
            .zip(self.coefficients.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        for (i, (column, coef)) in ranked.iter().enumerate() {
            let marker = if column.is_derived() { "*" } else { " " };
            s.push_str(&format!(
                "  {:3}. {:20}{}: {:>14.6}\n",
                i + 1,
                column.name(),
                marker,
                coef
            ));
        }
        s
    }

    /// Write the model as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ModelResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        debug!("Saved model to {:?}", path.as_ref());
        Ok(())
    }

    /// Read a model written by [`FittedModel::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let model: FittedModel = serde_json::from_reader(reader)?;

        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                found: model.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        let n_features = model.config.features.len();
        for got in [
            model.scaler.mean.len(),
            model.scaler.scale.len(),
            model.coefficients.len(),
        ] {
            if got != n_features {
                return Err(ModelError::DimensionMismatch {
                    expected: n_features,
                    got,
                });
            }
        }
        if model.scaler.scale.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(ModelError::InvalidModel(
                "scaler scale must be finite and positive".to_string(),
            ));
        }
        if model
            .scaler
            .mean
            .iter()
            .chain(model.coefficients.iter())
            .any(|v| !v.is_finite())
            || !model.intercept.is_finite()
        {
            return Err(ModelError::InvalidModel(
                "model parameters must be finite".to_string(),
            ));
        }

        debug!("Loaded model from {:?}", path.as_ref());
        Ok(model)
    }
}
