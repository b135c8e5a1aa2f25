//! Core data types for location records
//!
//! This module defines the record shapes that flow through the library:
//! - LocationRecord: raw candidate/training location attributes
//! - TrainingLocation: a location with its observed monthly profit
//! - FeatureRecord: the model-ready projection of a location
//! - FeatureColumn: the fixed, ordered set of model input columns

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw attributes of a retail location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
    /// Pedestrians passing per day
    pub foot_traffic: f64,
    /// Monthly rent per square metre
    pub rent_per_sqm: f64,
    /// Number of competing shops nearby
    pub competition: u32,
    /// Median household income of the area
    pub median_income: f64,
    /// Number of offices nearby
    pub office_density: u32,
    /// Share of activity happening on weekends, conventionally in [0, 1]
    pub weekend_activity: f64,
    /// Local events per month
    pub events_per_month: u32,
    /// Price of a regular coffee
    pub coffee_price: f64,
    /// Monthly promotion budget
    pub promo_spend: f64,
}

/// A labeled location used for training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingLocation {
    /// Raw location attributes
    #[serde(flatten)]
    pub location: LocationRecord,
    /// Observed monthly profit
    pub profit: f64,
}

impl TrainingLocation {
    /// Create a new labeled location
    pub fn new(location: LocationRecord, profit: f64) -> Self {
        Self { location, profit }
    }
}

/// Model-ready projection of a location: raw fields plus derived features
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    /// Raw fields, passed through unchanged
    pub location: LocationRecord,
    /// Foot traffic shared among competitors
    pub demand_adj: f64,
    /// Foot traffic expected on weekends
    pub wknd_traffic: f64,
    /// Coffee price weighted by local income (per thousand)
    pub price_income: f64,
    /// Promotion budget shared among competitors
    pub promo_comp_adj: f64,
}

/// Feature record carrying the training target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingFeatureRecord {
    /// Features of the location
    pub features: FeatureRecord,
    /// Observed monthly profit, passed through unchanged
    pub profit: f64,
}

/// Model input columns, in their canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    FootTraffic,
    RentPerSqm,
    Competition,
    MedianIncome,
    OfficeDensity,
    WeekendActivity,
    EventsPerMonth,
    CoffeePrice,
    PromoSpend,
    DemandAdj,
    WkndTraffic,
    PriceIncome,
    PromoCompAdj,
}

impl FeatureColumn {
    /// All model columns in canonical order
    pub const ALL: [FeatureColumn; 13] = [
        FeatureColumn::FootTraffic,
        FeatureColumn::RentPerSqm,
        FeatureColumn::Competition,
        FeatureColumn::MedianIncome,
        FeatureColumn::OfficeDensity,
        FeatureColumn::WeekendActivity,
        FeatureColumn::EventsPerMonth,
        FeatureColumn::CoffeePrice,
        FeatureColumn::PromoSpend,
        FeatureColumn::DemandAdj,
        FeatureColumn::WkndTraffic,
        FeatureColumn::PriceIncome,
        FeatureColumn::PromoCompAdj,
    ];

    /// Column name as used in reports and model artifacts
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::FootTraffic => "foot_traffic",
            FeatureColumn::RentPerSqm => "rent_per_sqm",
            FeatureColumn::Competition => "competition",
            FeatureColumn::MedianIncome => "median_income",
            FeatureColumn::OfficeDensity => "office_density",
            FeatureColumn::WeekendActivity => "weekend_activity",
            FeatureColumn::EventsPerMonth => "events_per_month",
            FeatureColumn::CoffeePrice => "coffee_price",
            FeatureColumn::PromoSpend => "promo_spend",
            FeatureColumn::DemandAdj => "demand_adj",
            FeatureColumn::WkndTraffic => "wknd_traffic",
            FeatureColumn::PriceIncome => "price_income",
            FeatureColumn::PromoCompAdj => "promo_comp_adj",
        }
    }

    /// Whether the column is computed rather than read from the source
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            FeatureColumn::DemandAdj
                | FeatureColumn::WkndTraffic
                | FeatureColumn::PriceIncome
                | FeatureColumn::PromoCompAdj
        )
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown column name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown feature column: {0}")]
pub struct UnknownColumn(pub String);

impl FromStr for FeatureColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureColumn::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}
