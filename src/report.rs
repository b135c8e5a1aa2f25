//! Run artifacts and where they are written
//!
//! Workflows hand their outputs to an [`ArtifactSink`] only after the whole
//! computation succeeded. [`DirectorySink`] writes the usual files into an
//! output directory; [`MemorySink`] keeps everything in memory.

use crate::metrics::RegressionMetrics;
use crate::models::{FeatureImportance, FittedModel, ModelError};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const METRICS_FILE: &str = "metrics.json";
pub const TRAINING_PREDICTIONS_FILE: &str = "predictions_train.csv";
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.csv";
pub const MODEL_FILE: &str = "model.json";
pub const SCORED_CANDIDATES_FILE: &str = "scored_candidates.csv";

/// Errors raised while writing artifacts
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV writing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON writing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model persistence failed: {0}")]
    Model(#[from] ModelError),
}

/// Result type alias for artifact operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Fitted vs. observed profit for one labeled location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPrediction {
    pub lat: f64,
    pub lon: f64,
    pub actual_profit: f64,
    pub predicted_profit: f64,
}

/// Predicted profit and rank of one candidate location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub lat: f64,
    pub lon: f64,
    pub predicted_profit: f64,
    /// 1 = most profitable
    pub rank: usize,
}

const TRAINING_PREDICTION_HEADER: [&str; 4] = ["lat", "lon", "actual_profit", "predicted_profit"];
const FEATURE_IMPORTANCE_HEADER: [&str; 2] = ["feature", "importance"];
const SCORED_CANDIDATE_HEADER: [&str; 4] = ["lat", "lon", "predicted_profit", "rank"];

/// Destination for run outputs
///
/// Writes may be staged; [`ArtifactSink::commit`] publishes everything
/// written so far.
pub trait ArtifactSink {
    fn write_metrics(&mut self, metrics: &RegressionMetrics) -> ReportResult<()>;

    fn write_training_predictions(&mut self, rows: &[TrainingPrediction]) -> ReportResult<()>;

    fn write_feature_importance(&mut self, rows: &[FeatureImportance]) -> ReportResult<()>;

    fn write_model(&mut self, model: &FittedModel) -> ReportResult<()>;

    fn write_scored_candidates(&mut self, rows: &[ScoredCandidate]) -> ReportResult<()>;

    fn commit(&mut self) -> ReportResult<()> {
        Ok(())
    }
}

/// Writes artifacts as files into a directory
///
/// Each artifact goes to a hidden temporary file first. `commit` renames
/// the staged files into place; staged files that were never committed
/// are removed when the sink is dropped.
#[derive(Debug)]
pub struct DirectorySink {
    outdir: PathBuf,
    staged: Vec<&'static str>,
}

impl DirectorySink {
    /// Create the sink, creating the directory if needed
    pub fn create<P: AsRef<Path>>(outdir: P) -> ReportResult<Self> {
        let outdir = outdir.as_ref().to_path_buf();
        fs::create_dir_all(&outdir).map_err(|source| ReportError::Io {
            path: outdir.clone(),
            source,
        })?;
        Ok(Self {
            outdir,
            staged: Vec::new(),
        })
    }

    /// Output directory
    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Full path of an artifact file
    pub fn path(&self, file: &str) -> PathBuf {
        self.outdir.join(file)
    }

    fn staging_path(&self, file: &str) -> PathBuf {
        self.outdir.join(format!(".{file}.tmp"))
    }

    fn stage(&mut self, file: &'static str) {
        if !self.staged.contains(&file) {
            self.staged.push(file);
        }
    }

    fn create_staged(&mut self, file: &'static str) -> ReportResult<(PathBuf, File)> {
        let path = self.staging_path(file);
        let handle = File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        self.stage(file);
        Ok((path, handle))
    }

    fn write_csv<T: Serialize>(
        &mut self,
        file: &'static str,
        header: &[&str],
        rows: &[T],
    ) -> ReportResult<()> {
        let (path, handle) = self.create_staged(file)?;
        let mut writer = Writer::from_writer(handle);
        if rows.is_empty() {
            writer.write_record(header)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .flush()
            .map_err(|source| ReportError::Io { path, source })?;
        debug!("Staged {} rows for {:?}", rows.len(), self.path(file));
        Ok(())
    }
}

impl ArtifactSink for DirectorySink {
    fn write_metrics(&mut self, metrics: &RegressionMetrics) -> ReportResult<()> {
        let (_, handle) = self.create_staged(METRICS_FILE)?;
        serde_json::to_writer_pretty(handle, metrics)?;
        Ok(())
    }

    fn write_training_predictions(&mut self, rows: &[TrainingPrediction]) -> ReportResult<()> {
        self.write_csv(TRAINING_PREDICTIONS_FILE, &TRAINING_PREDICTION_HEADER, rows)
    }

    fn write_feature_importance(&mut self, rows: &[FeatureImportance]) -> ReportResult<()> {
        self.write_csv(FEATURE_IMPORTANCE_FILE, &FEATURE_IMPORTANCE_HEADER, rows)
    }

    fn write_model(&mut self, model: &FittedModel) -> ReportResult<()> {
        model.save(self.staging_path(MODEL_FILE))?;
        self.stage(MODEL_FILE);
        Ok(())
    }

    fn write_scored_candidates(&mut self, rows: &[ScoredCandidate]) -> ReportResult<()> {
        self.write_csv(SCORED_CANDIDATES_FILE, &SCORED_CANDIDATE_HEADER, rows)
    }

    fn commit(&mut self) -> ReportResult<()> {
        for file in std::mem::take(&mut self.staged) {
            let target = self.path(file);
            fs::rename(self.staging_path(file), &target).map_err(|source| ReportError::Io {
                path: target.clone(),
                source,
            })?;
            info!("Wrote {:?}", target);
        }
        Ok(())
    }
}

impl Drop for DirectorySink {
    fn drop(&mut self) {
        for file in &self.staged {
            let _ = fs::remove_file(self.staging_path(file));
        }
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub metrics: Option<RegressionMetrics>,
    pub training_predictions: Option<Vec<TrainingPrediction>>,
    pub feature_importance: Option<Vec<FeatureImportance>>,
    pub model: Option<FittedModel>,
    pub scored_candidates: Option<Vec<ScoredCandidate>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none()
            && self.training_predictions.is_none()
            && self.feature_importance.is_none()
            && self.model.is_none()
            && self.scored_candidates.is_none()
    }
}

impl ArtifactSink for MemorySink {
    fn write_metrics(&mut self, metrics: &RegressionMetrics) -> ReportResult<()> {
        self.metrics = Some(metrics.clone());
        Ok(())
    }

    fn write_training_predictions(&mut self, rows: &[TrainingPrediction]) -> ReportResult<()> {
        self.training_predictions = Some(rows.to_vec());
        Ok(())
    }

    fn write_feature_importance(&mut self, rows: &[FeatureImportance]) -> ReportResult<()> {
        self.feature_importance = Some(rows.to_vec());
        Ok(())
    }

    fn write_model(&mut self, model: &FittedModel) -> ReportResult<()> {
        self.model = Some(model.clone());
        Ok(())
    }

    fn write_scored_candidates(&mut self, rows: &[ScoredCandidate]) -> ReportResult<()> {
        self.scored_candidates = Some(rows.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_sink_writes_files() {
        let dir = tempdir().unwrap();
        let outdir = dir.path().join("nested").join("outputs");
        let mut sink = DirectorySink::create(&outdir).unwrap();

        sink.write_metrics(&RegressionMetrics {
            r_squared: 0.9,
            mean_absolute_error: 12.5,
            n_samples: 4,
        })
        .unwrap();
        sink.write_scored_candidates(&[ScoredCandidate {
            lat: 1.0,
            lon: 2.0,
            predicted_profit: 300.0,
            rank: 1,
        }])
        .unwrap();

        assert!(!outdir.join(METRICS_FILE).exists());
        sink.commit().unwrap();

        let metrics: RegressionMetrics =
            serde_json::from_str(&fs::read_to_string(outdir.join(METRICS_FILE)).unwrap()).unwrap();
        assert_eq!(metrics.n_samples, 4);

        let scored = fs::read_to_string(outdir.join(SCORED_CANDIDATES_FILE)).unwrap();
        let mut lines = scored.lines();
        assert_eq!(lines.next(), Some("lat,lon,predicted_profit,rank"));
        assert_eq!(lines.next(), Some("1.0,2.0,300.0,1"));
    }

    #[test]
    fn test_empty_rows_keep_header() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::create(dir.path()).unwrap();

        sink.write_scored_candidates(&[]).unwrap();
        sink.write_feature_importance(&[]).unwrap();
        sink.commit().unwrap();

        let scored = fs::read_to_string(dir.path().join(SCORED_CANDIDATES_FILE)).unwrap();
        assert_eq!(scored, "lat,lon,predicted_profit,rank\n");
        let importance = fs::read_to_string(dir.path().join(FEATURE_IMPORTANCE_FILE)).unwrap();
        assert_eq!(importance, "feature,importance\n");
    }

    #[test]
    fn test_uncommitted_writes_are_discarded() {
        let dir = tempdir().unwrap();
        let outdir = dir.path().join("outputs");
        fs::create_dir_all(&outdir).unwrap();
        fs::write(outdir.join(METRICS_FILE), "previous run").unwrap();

        {
            let mut sink = DirectorySink::create(&outdir).unwrap();
            sink.write_metrics(&RegressionMetrics {
                r_squared: 0.5,
                mean_absolute_error: 1.0,
                n_samples: 2,
            })
            .unwrap();
            sink.write_training_predictions(&[]).unwrap();
        }

        let names: Vec<String> = fs::read_dir(&outdir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![METRICS_FILE.to_string()]);
        assert_eq!(
            fs::read_to_string(outdir.join(METRICS_FILE)).unwrap(),
            "previous run"
        );
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write_feature_importance(&[FeatureImportance {
            feature: "demand_adj".into(),
            importance: 1.5,
        }])
        .unwrap();
        assert!(!sink.is_empty());
        assert_eq!(sink.feature_importance.as_ref().unwrap().len(), 1);
    }
}
