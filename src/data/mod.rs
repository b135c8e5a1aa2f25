//! Location records, feature engineering and dataset preparation

pub mod features;
pub mod loader;
pub mod processor;
pub mod types;

pub use features::{
    design_matrix, feature_matrix, features_for_candidates, features_for_training, FeatureQueries,
};
pub use loader::{
    flag_out_of_range, CsvSource, DataError, DataResult, LocationSource, MemorySource,
    RangeFlag, RangeIssue,
};
pub use processor::StandardScaler;
pub use types::{
    FeatureColumn, FeatureRecord, LocationRecord, TrainingFeatureRecord, TrainingLocation,
};
