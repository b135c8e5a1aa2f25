//! # Site Profit
//!
//! Estimates monthly profit of candidate coffee shop locations with an
//! elastic-net linear model over engineered location features.
//!
//! ## Modules
//!
//! - `data` - Location records, feature engineering, CSV loading, scaling
//! - `models` - Elastic Net regression and the fit/predict pipeline
//! - `metrics` - Model evaluation metrics
//! - `report` - Artifact sinks for metrics, predictions and models
//! - `workflow` - Training and scoring runs

pub mod data;
pub mod metrics;
pub mod models;
pub mod report;
pub mod workflow;

pub use data::{
    CsvSource, FeatureColumn, FeatureQueries, FeatureRecord, LocationRecord, LocationSource,
    MemorySource, TrainingLocation,
};
pub use metrics::{evaluate, RegressionMetrics};
pub use models::{ElasticNet, FittedModel, PipelineConfig, ProfitPipeline, Selection};
pub use report::{ArtifactSink, DirectorySink, MemorySink};
pub use workflow::{run_scoring, run_training, TrainingConfig, TrainingReport};
