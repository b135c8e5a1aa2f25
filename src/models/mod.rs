//! Regression models and the profit pipeline

pub mod error;
pub mod pipeline;
pub mod regularization;

pub use error::{ModelError, ModelResult};
pub use pipeline::{FeatureImportance, FittedModel, PipelineConfig, ProfitPipeline};
pub use regularization::{ElasticNet, Selection};
