//! Training and scoring runs
//!
//! Each run receives its location source and artifact sink as arguments.
//! Outputs are handed to the sink only after every computation of the run
//! has succeeded, and the sink is committed once all of them are written.

use crate::data::processor::{shuffled_split, take_rows};
use crate::data::{design_matrix, DataError, FeatureQueries, LocationSource};
use crate::metrics::{MetricsError, RegressionMetrics};
use crate::models::{
    FeatureImportance, FittedModel, ModelError, PipelineConfig, ProfitPipeline,
};
use crate::report::{ArtifactSink, ReportError, ScoredCandidate, TrainingPrediction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Result type alias for runs
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Settings of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Model hyperparameters
    pub pipeline: PipelineConfig,
    /// Share of labeled rows held out for evaluation
    pub test_size: f64,
    /// Seed of the train/holdout shuffle
    pub split_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            test_size: 0.25,
            split_seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Set the model hyperparameters
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Set the holdout share
    pub fn test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the split seed
    pub fn split_seed(mut self, split_seed: u64) -> Self {
        self.split_seed = split_seed;
        self
    }
}

/// Everything a training run produced
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: FittedModel,
    /// Metrics on the holdout rows (training rows when there is no holdout)
    pub metrics: RegressionMetrics,
    pub predictions: Vec<TrainingPrediction>,
    /// Sorted by descending absolute coefficient
    pub feature_importance: Vec<FeatureImportance>,
    pub n_train: usize,
    pub n_holdout: usize,
}

/// Fit a model on the labeled locations and write its artifacts
pub fn run_training<S, K>(
    source: &S,
    sink: &mut K,
    config: &TrainingConfig,
) -> WorkflowResult<TrainingReport>
where
    S: LocationSource + ?Sized,
    K: ArtifactSink + ?Sized,
{
    if !(0.0..1.0).contains(&config.test_size) {
        return Err(ModelError::InvalidConfig(format!(
            "test_size must be within [0, 1), got {}",
            config.test_size
        ))
        .into());
    }

    let records = FeatureQueries::new(source).features_for_training()?;
    info!("Loaded {} labeled locations", records.len());

    let (x, y) = design_matrix(&records, &config.pipeline.features);
    let (train_rows, holdout_rows) =
        shuffled_split(records.len(), config.test_size, config.split_seed);
    let (x_train, y_train) = take_rows(&x, &y, &train_rows);

    let model = ProfitPipeline::new(config.pipeline.clone()).fit_matrix(&x_train, &y_train)?;

    let metrics = if holdout_rows.is_empty() {
        warn!("No holdout rows, evaluating on the training rows");
        let fitted = model.predict_matrix(&x_train)?;
        RegressionMetrics::evaluate(&y_train, &fitted)?
    } else {
        let (x_holdout, y_holdout) = take_rows(&x, &y, &holdout_rows);
        let predicted = model.predict_matrix(&x_holdout)?;
        RegressionMetrics::evaluate(&y_holdout, &predicted)?
    };
    info!(
        "Evaluation on {} rows: R² = {:.4}, MAE = {:.4}",
        metrics.n_samples, metrics.r_squared, metrics.mean_absolute_error
    );

    let fitted_all = model.predict_matrix(&x)?;
    let predictions: Vec<TrainingPrediction> = records
        .iter()
        .zip(fitted_all.iter())
        .map(|(record, &predicted_profit)| TrainingPrediction {
            lat: record.features.location.lat,
            lon: record.features.location.lon,
            actual_profit: record.profit,
            predicted_profit,
        })
        .collect();

    let feature_importance = model.ranked_importance();

    sink.write_metrics(&metrics)?;
    sink.write_training_predictions(&predictions)?;
    sink.write_feature_importance(&feature_importance)?;
    sink.write_model(&model)?;
    sink.commit()?;

    Ok(TrainingReport {
        model,
        metrics,
        predictions,
        feature_importance,
        n_train: train_rows.len(),
        n_holdout: holdout_rows.len(),
    })
}

/// Score candidate locations with a fitted model and write the ranking
pub fn run_scoring<S, K>(
    source: &S,
    sink: &mut K,
    model: &FittedModel,
) -> WorkflowResult<Vec<ScoredCandidate>>
where
    S: LocationSource + ?Sized,
    K: ArtifactSink + ?Sized,
{
    let candidates = FeatureQueries::new(source).features_for_candidates()?;
    info!("Scoring {} candidate locations", candidates.len());

    let predictions = model.predict(&candidates)?;

    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .zip(predictions.iter())
        .map(|(candidate, &predicted_profit)| ScoredCandidate {
            lat: candidate.location.lat,
            lon: candidate.location.lon,
            predicted_profit,
            rank: 0,
        })
        .collect();

    // Stable sort keeps input order among ties
    scored.sort_by(|a, b| b.predicted_profit.total_cmp(&a.predicted_profit));
    for (i, candidate) in scored.iter_mut().enumerate() {
        candidate.rank = i + 1;
    }

    sink.write_scored_candidates(&scored)?;
    sink.commit()?;

    Ok(scored)
}
