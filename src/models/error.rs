//! Model error types

use thiserror::Error;

/// Errors that can occur while fitting, applying or persisting a model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Insufficient data: {rows} training rows for {features} feature columns")]
    InsufficientData { rows: usize, features: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Model file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid model file: {0}")]
    InvalidModel(String),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
