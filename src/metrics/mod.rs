//! Model evaluation metrics

pub mod regression;

pub use regression::{evaluate, MetricsError, RegressionMetrics};
