//! Location data loading
//!
//! Record collections reach the library through the [`LocationSource`]
//! trait, so each run receives its input handle explicitly. CSV files and
//! in-memory vectors are supported.

use super::types::{LocationRecord, TrainingLocation};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the labeled collection
pub const TRAINING_COLLECTION: &str = "locations_train";
/// Name of the unlabeled collection
pub const CANDIDATE_COLLECTION: &str = "locations_candidates";

/// Raw columns every location collection must provide
pub const LOCATION_COLUMNS: [&str; 11] = [
    "lat",
    "lon",
    "foot_traffic",
    "rent_per_sqm",
    "competition",
    "median_income",
    "office_density",
    "weekend_activity",
    "events_per_month",
    "coffee_price",
    "promo_spend",
];

/// Target column of the labeled collection
pub const TARGET_COLUMN: &str = "profit";

/// Errors raised while materializing location records
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Missing columns for {collection}: {missing:?}. Please check your input CSV schema.")]
    Schema {
        collection: String,
        missing: Vec<String>,
    },

    #[error("Invalid {column} value {value:?} in {collection} row {row}: expected {expected}")]
    Type {
        collection: String,
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("No input configured for {0}")]
    MissingSource(String),

    #[error("Failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;

/// A provider of the training and candidate location collections
pub trait LocationSource {
    /// Labeled locations with observed profit
    fn training_locations(&self) -> DataResult<Vec<TrainingLocation>>;

    /// Unlabeled candidate locations
    fn candidate_locations(&self) -> DataResult<Vec<LocationRecord>>;
}

/// Location source backed by in-memory collections
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    training: Vec<TrainingLocation>,
    candidates: Vec<LocationRecord>,
}

impl MemorySource {
    /// Create a source from already materialized collections
    pub fn new(training: Vec<TrainingLocation>, candidates: Vec<LocationRecord>) -> Self {
        Self {
            training,
            candidates,
        }
    }
}

impl LocationSource for MemorySource {
    fn training_locations(&self) -> DataResult<Vec<TrainingLocation>> {
        Ok(self.training.clone())
    }

    fn candidate_locations(&self) -> DataResult<Vec<LocationRecord>> {
        Ok(self.candidates.clone())
    }
}

/// Location source reading CSV files with a header row
///
/// Extra columns are ignored. Either path may be absent when a run only
/// needs one of the collections.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    training_path: Option<PathBuf>,
    candidates_path: Option<PathBuf>,
}

impl CsvSource {
    /// Create a source with no files attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the labeled locations file
    pub fn with_training<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.training_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Attach the candidate locations file
    pub fn with_candidates<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.candidates_path = Some(path.as_ref().to_path_buf());
        self
    }

    fn open(path: Option<&PathBuf>, collection: &str) -> DataResult<File> {
        let path = path.ok_or_else(|| DataError::MissingSource(collection.to_string()))?;
        File::open(path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl LocationSource for CsvSource {
    fn training_locations(&self) -> DataResult<Vec<TrainingLocation>> {
        let file = Self::open(self.training_path.as_ref(), TRAINING_COLLECTION)?;
        let records = read_training_locations(file)?;
        let locations: Vec<LocationRecord> = records.iter().map(|t| t.location).collect();
        log_range_flags(TRAINING_COLLECTION, &locations);
        Ok(records)
    }

    fn candidate_locations(&self) -> DataResult<Vec<LocationRecord>> {
        let file = Self::open(self.candidates_path.as_ref(), CANDIDATE_COLLECTION)?;
        let records = read_locations(file, CANDIDATE_COLLECTION)?;
        log_range_flags(CANDIDATE_COLLECTION, &records);
        Ok(records)
    }
}

/// Read unlabeled locations from CSV
pub fn read_locations<R: Read>(reader: R, collection: &str) -> DataResult<Vec<LocationRecord>> {
    let mut csv = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let index = ColumnIndex::resolve(csv.headers()?, &LOCATION_COLUMNS, collection)?;

    let mut locations = Vec::new();
    for (i, result) in csv.records().enumerate() {
        let record = result?;
        locations.push(index.location(&record, i + 1)?);
    }

    debug!("Read {} rows from {}", locations.len(), collection);
    Ok(locations)
}

/// Read labeled locations from CSV
pub fn read_training_locations<R: Read>(reader: R) -> DataResult<Vec<TrainingLocation>> {
    let mut required = LOCATION_COLUMNS.to_vec();
    required.push(TARGET_COLUMN);

    let mut csv = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let index = ColumnIndex::resolve(csv.headers()?, &required, TRAINING_COLLECTION)?;

    let mut locations = Vec::new();
    for (i, result) in csv.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let location = index.location(&record, row)?;
        let profit = index.float(&record, row, TARGET_COLUMN)?;
        locations.push(TrainingLocation::new(location, profit));
    }

    debug!("Read {} rows from {}", locations.len(), TRAINING_COLLECTION);
    Ok(locations)
}

/// Header positions of the required columns
struct ColumnIndex {
    collection: String,
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn resolve(
        headers: &StringRecord,
        required: &[&'static str],
        collection: &str,
    ) -> DataResult<Self> {
        let mut positions = HashMap::new();
        let mut missing = Vec::new();

        for &name in required {
            match headers.iter().position(|h| h == name) {
                Some(pos) => {
                    positions.insert(name, pos);
                }
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            missing.sort();
            return Err(DataError::Schema {
                collection: collection.to_string(),
                missing,
            });
        }

        Ok(Self {
            collection: collection.to_string(),
            positions,
        })
    }

    fn raw<'r>(&self, record: &'r StringRecord, column: &'static str) -> &'r str {
        // The reader is strict, so every record has as many fields as the header
        self.positions
            .get(column)
            .and_then(|&pos| record.get(pos))
            .unwrap_or("")
    }

    fn type_error(
        &self,
        row: usize,
        column: &str,
        value: &str,
        expected: &'static str,
    ) -> DataError {
        DataError::Type {
            collection: self.collection.clone(),
            row,
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    fn float(&self, record: &StringRecord, row: usize, column: &'static str) -> DataResult<f64> {
        let raw = self.raw(record, column);
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.type_error(row, column, raw, "a finite number")),
        }
    }

    fn count(&self, record: &StringRecord, row: usize, column: &'static str) -> DataResult<u32> {
        let raw = self.raw(record, column);
        if let Ok(v) = raw.parse::<u32>() {
            return Ok(v);
        }

        // Integral values written in decimal notation, e.g. "3.0"
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => {
                Ok(v as u32)
            }
            _ => Err(self.type_error(row, column, raw, "a non-negative integer")),
        }
    }

    fn location(&self, record: &StringRecord, row: usize) -> DataResult<LocationRecord> {
        Ok(LocationRecord {
            lat: self.float(record, row, "lat")?,
            lon: self.float(record, row, "lon")?,
            foot_traffic: self.float(record, row, "foot_traffic")?,
            rent_per_sqm: self.float(record, row, "rent_per_sqm")?,
            competition: self.count(record, row, "competition")?,
            median_income: self.float(record, row, "median_income")?,
            office_density: self.count(record, row, "office_density")?,
            weekend_activity: self.float(record, row, "weekend_activity")?,
            events_per_month: self.count(record, row, "events_per_month")?,
            coffee_price: self.float(record, row, "coffee_price")?,
            promo_spend: self.float(record, row, "promo_spend")?,
        })
    }
}

/// Kinds of implausible values that are reported but not rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeIssue {
    WeekendActivityOutsideUnit,
    NonPositiveCoffeePrice,
    NonPositiveMedianIncome,
}

/// An implausible value found in a location record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFlag {
    /// Zero-based position of the record in its collection
    pub index: usize,
    /// What looks wrong
    pub issue: RangeIssue,
    /// The offending value
    pub value: f64,
}

/// Find implausible values without rejecting them
pub fn flag_out_of_range(locations: &[LocationRecord]) -> Vec<RangeFlag> {
    let mut flags = Vec::new();

    for (index, loc) in locations.iter().enumerate() {
        if !(0.0..=1.0).contains(&loc.weekend_activity) {
            flags.push(RangeFlag {
                index,
                issue: RangeIssue::WeekendActivityOutsideUnit,
                value: loc.weekend_activity,
            });
        }
        if loc.coffee_price <= 0.0 {
            flags.push(RangeFlag {
                index,
                issue: RangeIssue::NonPositiveCoffeePrice,
                value: loc.coffee_price,
            });
        }
        if loc.median_income <= 0.0 {
            flags.push(RangeFlag {
                index,
                issue: RangeIssue::NonPositiveMedianIncome,
                value: loc.median_income,
            });
        }
    }

    flags
}

fn log_range_flags(collection: &str, locations: &[LocationRecord]) {
    for flag in flag_out_of_range(locations) {
        warn!(
            "{} row {}: {:?} (value {})",
            collection,
            flag.index + 1,
            flag.issue,
            flag.value
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "lat,lon,foot_traffic,rent_per_sqm,competition,median_income,office_density,weekend_activity,events_per_month,coffee_price,promo_spend";

    #[test]
    fn test_read_candidates() {
        let data = format!(
            "{HEADER}\n52.5,13.4,200,25.0,3,30000,12,0.5,4,4.0,100\n48.1,11.6,150.5,30,0.0,45000,8,0.3,2,3.5,50\n"
        );
        let locations = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].competition, 3);
        assert_eq!(locations[1].competition, 0);
        assert_eq!(locations[1].foot_traffic, 150.5);
    }

    #[test]
    fn test_column_order_and_extra_columns_ignored() {
        let data = "note,promo_spend,coffee_price,events_per_month,weekend_activity,office_density,median_income,competition,rent_per_sqm,foot_traffic,lon,lat,profit\n\
                    x,100,4.0,4,0.5,12,30000,3,25,200,13.4,52.5,900\n";
        let locations = read_training_locations(data.as_bytes()).unwrap();

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].profit, 900.0);
        assert_eq!(locations[0].location.lat, 52.5);
        assert_eq!(locations[0].location.promo_spend, 100.0);
    }

    #[test]
    fn test_missing_columns_is_schema_error() {
        let data = "lat,lon,foot_traffic\n1,2,3\n";
        let err = read_training_locations(data.as_bytes()).unwrap_err();

        match err {
            DataError::Schema {
                collection,
                missing,
            } => {
                assert_eq!(collection, TRAINING_COLLECTION);
                assert!(missing.contains(&"profit".to_string()));
                assert!(missing.contains(&"competition".to_string()));
                let mut sorted = missing.clone();
                sorted.sort();
                assert_eq!(missing, sorted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_is_type_error() {
        let data = format!("{HEADER}\n52.5,13.4,abc,25.0,3,30000,12,0.5,4,4.0,100\n");
        let err = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap_err();

        match err {
            DataError::Type {
                row, column, value, ..
            } => {
                assert_eq!(row, 1);
                assert_eq!(column, "foot_traffic");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_competition_is_type_error() {
        let data = format!("{HEADER}\n52.5,13.4,200,25.0,-1,30000,12,0.5,4,4.0,100\n");
        let err = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap_err();
        match err {
            DataError::Type { column, .. } => assert_eq!(column, "competition"),
            other => panic!("unexpected error: {other}"),
        }

        let data = format!("{HEADER}\n52.5,13.4,200,25.0,1.5,30000,12,0.5,4,4.0,100\n");
        let result = read_locations(data.as_bytes(), CANDIDATE_COLLECTION);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_value_is_type_error() {
        let data = format!("{HEADER}\n52.5,13.4,200,,3,30000,12,0.5,4,4.0,100\n");
        let err = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap_err();
        match err {
            DataError::Type { column, .. } => assert_eq!(column, "rent_per_sqm"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_is_rejected_by_reader() {
        let data = format!("{HEADER}\n52.5,13.4,200,25.0,3\n");
        let err = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
    }

    #[test]
    fn test_range_flags_do_not_reject() {
        let data = format!("{HEADER}\n52.5,13.4,200,25.0,3,-10,12,1.7,4,0,100\n");
        let locations = read_locations(data.as_bytes(), CANDIDATE_COLLECTION).unwrap();
        let flags = flag_out_of_range(&locations);

        let issues: Vec<_> = flags.iter().map(|f| f.issue).collect();
        assert_eq!(
            issues,
            vec![
                RangeIssue::WeekendActivityOutsideUnit,
                RangeIssue::NonPositiveCoffeePrice,
                RangeIssue::NonPositiveMedianIncome,
            ]
        );
        assert_eq!(flags[0].value, 1.7);
    }

    #[test]
    fn test_csv_source_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "52.5,13.4,200,25.0,3,30000,12,0.5,4,4.0,100").unwrap();
        drop(file);

        let source = CsvSource::new().with_candidates(&path);
        assert_eq!(source.candidate_locations().unwrap().len(), 1);
        assert!(matches!(
            source.training_locations(),
            Err(DataError::MissingSource(_))
        ));

        let missing = CsvSource::new().with_candidates(dir.path().join("nope.csv"));
        assert!(matches!(
            missing.candidate_locations(),
            Err(DataError::Io { .. })
        ));
    }
}
