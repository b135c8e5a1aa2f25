//! Feature engineering for location profit prediction
//!
//! Derived features are pure functions of a single raw record. The same
//! derivation is used for training and candidate collections, and feature
//! records are recomputed from the source on every query.

use super::loader::{DataResult, LocationSource};
use super::types::{
    FeatureColumn, FeatureRecord, LocationRecord, TrainingFeatureRecord, TrainingLocation,
};
use ndarray::{Array1, Array2};

impl FeatureRecord {
    /// Derive the model-ready projection of a raw location
    pub fn derive(location: &LocationRecord) -> Self {
        let competitors = 1.0 + f64::from(location.competition);

        Self {
            location: *location,
            demand_adj: location.foot_traffic / competitors,
            wknd_traffic: location.weekend_activity * location.foot_traffic,
            price_income: location.coffee_price * (location.median_income / 1000.0),
            promo_comp_adj: location.promo_spend / competitors,
        }
    }

    /// Value of a model column for this record
    pub fn value(&self, column: FeatureColumn) -> f64 {
        let loc = &self.location;
        match column {
            FeatureColumn::FootTraffic => loc.foot_traffic,
            FeatureColumn::RentPerSqm => loc.rent_per_sqm,
            FeatureColumn::Competition => f64::from(loc.competition),
            FeatureColumn::MedianIncome => loc.median_income,
            FeatureColumn::OfficeDensity => f64::from(loc.office_density),
            FeatureColumn::WeekendActivity => loc.weekend_activity,
            FeatureColumn::EventsPerMonth => f64::from(loc.events_per_month),
            FeatureColumn::CoffeePrice => loc.coffee_price,
            FeatureColumn::PromoSpend => loc.promo_spend,
            FeatureColumn::DemandAdj => self.demand_adj,
            FeatureColumn::WkndTraffic => self.wknd_traffic,
            FeatureColumn::PriceIncome => self.price_income,
            FeatureColumn::PromoCompAdj => self.promo_comp_adj,
        }
    }
}

/// Project candidate locations into feature records, preserving order
pub fn features_for_candidates(locations: &[LocationRecord]) -> Vec<FeatureRecord> {
    locations.iter().map(FeatureRecord::derive).collect()
}

/// Project labeled locations into feature records, passing the target through
pub fn features_for_training(locations: &[TrainingLocation]) -> Vec<TrainingFeatureRecord> {
    locations
        .iter()
        .map(|t| TrainingFeatureRecord {
            features: FeatureRecord::derive(&t.location),
            profit: t.profit,
        })
        .collect()
}

/// Build a feature matrix (n_samples x n_columns) in the given column order
pub fn feature_matrix(records: &[FeatureRecord], columns: &[FeatureColumn]) -> Array2<f64> {
    Array2::from_shape_fn((records.len(), columns.len()), |(i, j)| {
        records[i].value(columns[j])
    })
}

/// Split labeled feature records into a feature matrix and target vector
pub fn design_matrix(
    records: &[TrainingFeatureRecord],
    columns: &[FeatureColumn],
) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((records.len(), columns.len()), |(i, j)| {
        records[i].features.value(columns[j])
    });
    let y = records.iter().map(|r| r.profit).collect();

    (x, y)
}

/// The two named feature queries over an injected location source
///
/// Each call re-reads the source and recomputes the projection; nothing is
/// cached between calls.
#[derive(Debug)]
pub struct FeatureQueries<'a, S: LocationSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: LocationSource + ?Sized> FeatureQueries<'a, S> {
    /// Create queries over a location source
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Feature records for the labeled training collection
    pub fn features_for_training(&self) -> DataResult<Vec<TrainingFeatureRecord>> {
        let locations = self.source.training_locations()?;
        Ok(features_for_training(&locations))
    }

    /// Feature records for the unlabeled candidate collection
    pub fn features_for_candidates(&self) -> DataResult<Vec<FeatureRecord>> {
        let locations = self.source.candidate_locations()?;
        Ok(features_for_candidates(&locations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::MemorySource;

    fn sample_location() -> LocationRecord {
        LocationRecord {
            lat: 52.52,
            lon: 13.405,
            foot_traffic: 200.0,
            rent_per_sqm: 25.0,
            competition: 3,
            median_income: 30000.0,
            office_density: 12,
            weekend_activity: 0.5,
            events_per_month: 4,
            coffee_price: 4.0,
            promo_spend: 100.0,
        }
    }

    #[test]
    fn test_derived_features() {
        let features = FeatureRecord::derive(&sample_location());

        assert!((features.demand_adj - 50.0).abs() < 1e-12);
        assert!((features.wknd_traffic - 100.0).abs() < 1e-12);
        assert!((features.price_income - 120.0).abs() < 1e-12);
        assert!((features.promo_comp_adj - 25.0).abs() < 1e-12);
        assert_eq!(features.location, sample_location());
    }

    #[test]
    fn test_no_competition_divides_by_one() {
        let mut location = sample_location();
        location.competition = 0;
        let features = FeatureRecord::derive(&location);

        assert_eq!(features.demand_adj, 200.0);
        assert_eq!(features.promo_comp_adj, 100.0);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let location = sample_location();
        let first = FeatureRecord::derive(&location);
        assert_eq!(first, FeatureRecord::derive(&location));
    }

    #[test]
    fn test_training_and_candidate_paths_match() {
        let location = sample_location();
        let train = features_for_training(&[TrainingLocation::new(location, 1234.0)]);
        let cand = features_for_candidates(&[location]);

        assert_eq!(train[0].features, cand[0]);
        assert_eq!(train[0].profit, 1234.0);
        for column in FeatureColumn::ALL {
            assert_eq!(
                train[0].features.value(column).to_bits(),
                cand[0].value(column).to_bits()
            );
        }
    }

    #[test]
    fn test_order_preserved() {
        let mut second = sample_location();
        second.foot_traffic = 10.0;
        let features = features_for_candidates(&[sample_location(), second]);

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].location.foot_traffic, 200.0);
        assert_eq!(features[1].location.foot_traffic, 10.0);
    }

    #[test]
    fn test_feature_matrix_layout() {
        let records = features_for_candidates(&[sample_location()]);
        let columns = [FeatureColumn::Competition, FeatureColumn::DemandAdj];
        let x = feature_matrix(&records, &columns);

        assert_eq!(x.dim(), (1, 2));
        assert_eq!(x[[0, 0]], 3.0);
        assert_eq!(x[[0, 1]], 50.0);
    }

    #[test]
    fn test_queries_recompute_from_source() {
        let source = MemorySource::new(
            vec![TrainingLocation::new(sample_location(), 10.0)],
            vec![sample_location()],
        );
        let queries = FeatureQueries::new(&source);

        let first = queries.features_for_training().unwrap();
        let second = queries.features_for_training().unwrap();
        assert_eq!(first, second);

        let candidates = queries.features_for_candidates().unwrap();
        assert_eq!(candidates[0], first[0].features);
    }
}
