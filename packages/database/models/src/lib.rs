#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `DuckDB` database: the `locations` dimension table and the
//! `housing_data` / `mortgage_data` fact tables. `New*` types are rows staged
//! for insert (no surrogate id or ingestion timestamp yet).

use chrono::{DateTime, NaiveDate, Utc};
use housing_market_models::{LocationType, MortgageSeries, NATIONAL_NAME, NATIONAL_STATE_CODE};
use serde::{Deserialize, Serialize};

/// A location to look up by (`location_type`, `state_code`) or create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    /// Granularity of the location.
    pub location_type: LocationType,
    /// Display name (e.g. "California").
    pub name: String,
    /// Two-letter state or country code. Part of the lookup key.
    pub state_code: String,
    /// Five-digit ZIP code, for ZIP-level locations.
    pub zip_code: Option<String>,
}

impl NewLocation {
    /// A state-level location.
    #[must_use]
    pub fn state(name: &str, state_code: &str) -> Self {
        Self {
            location_type: LocationType::State,
            name: name.to_string(),
            state_code: state_code.to_string(),
            zip_code: None,
        }
    }

    /// The single national location that mortgage rates are keyed to.
    #[must_use]
    pub fn national() -> Self {
        Self {
            location_type: LocationType::Country,
            name: NATIONAL_NAME.to_string(),
            state_code: NATIONAL_STATE_CODE.to_string(),
            zip_code: None,
        }
    }
}

/// A `locations` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    /// Primary key.
    pub id: i64,
    /// Granularity of the location.
    pub location_type: LocationType,
    /// Display name.
    pub name: String,
    /// Two-letter code; `None` for non-US locations.
    pub state_code: Option<String>,
    /// Five-digit ZIP code.
    pub zip_code: Option<String>,
}

/// A `housing_data` row staged for insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHousingData {
    /// Location the observation belongs to.
    pub location_id: i64,
    /// Observation date (period end).
    pub date: NaiveDate,
    /// Median sale price.
    pub median_price: Option<f64>,
    /// Median sale price per square foot.
    pub median_price_sqft: Option<f64>,
    /// Median days on market.
    pub median_dom: Option<i64>,
    /// Active listing count.
    pub inventory: Option<i64>,
    /// Newly listed home count.
    pub new_listings: Option<i64>,
    /// Listings with a price reduction.
    pub price_reduced: Option<i64>,
}

/// A stored `housing_data` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingDataRow {
    /// Primary key.
    pub id: i64,
    /// Location the observation belongs to.
    pub location_id: i64,
    /// Observation date.
    pub date: NaiveDate,
    /// Median sale price.
    pub median_price: Option<f64>,
    /// Median sale price per square foot.
    pub median_price_sqft: Option<f64>,
    /// Median days on market.
    pub median_dom: Option<i64>,
    /// Active listing count.
    pub inventory: Option<i64>,
    /// Newly listed home count.
    pub new_listings: Option<i64>,
    /// Listings with a price reduction.
    pub price_reduced: Option<i64>,
    /// When the row was ingested.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// A `mortgage_data` row staged for insert.
///
/// Exactly one rate column is populated: the one belonging to `series`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMortgageData {
    /// Location the observation belongs to (the national row).
    pub location_id: i64,
    /// Series the observation came from.
    pub series: MortgageSeries,
    /// Observation date.
    pub date: NaiveDate,
    /// 30-year fixed rate, in percent.
    pub rate_30yr_fixed: Option<f64>,
    /// 15-year fixed rate, in percent.
    pub rate_15yr_fixed: Option<f64>,
    /// 5/1 adjustable rate, in percent.
    pub rate_5yr_arm: Option<f64>,
}

impl NewMortgageData {
    /// Builds a row with only the rate column of `series` set to `rate`.
    #[must_use]
    pub const fn from_observation(
        location_id: i64,
        series: MortgageSeries,
        date: NaiveDate,
        rate: f64,
    ) -> Self {
        let (rate_30yr_fixed, rate_15yr_fixed, rate_5yr_arm) = match series {
            MortgageSeries::ThirtyYearFixed => (Some(rate), None, None),
            MortgageSeries::FifteenYearFixed => (None, Some(rate), None),
            MortgageSeries::FiveYearArm => (None, None, Some(rate)),
        };
        Self {
            location_id,
            series,
            date,
            rate_30yr_fixed,
            rate_15yr_fixed,
            rate_5yr_arm,
        }
    }
}

/// A stored `mortgage_data` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageDataRow {
    /// Primary key.
    pub id: i64,
    /// Location the observation belongs to.
    pub location_id: i64,
    /// Series the observation came from.
    pub series: MortgageSeries,
    /// Observation date.
    pub date: NaiveDate,
    /// 30-year fixed rate, in percent.
    pub rate_30yr_fixed: Option<f64>,
    /// 15-year fixed rate, in percent.
    pub rate_15yr_fixed: Option<f64>,
    /// 5/1 adjustable rate, in percent.
    pub rate_5yr_arm: Option<f64>,
    /// When the row was ingested.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Inclusive range of observation dates in a fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest observation date.
    pub start: NaiveDate,
    /// Latest observation date.
    pub end: NaiveDate,
}

/// Count of NULL values per nullable `housing_data` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingNullCounts {
    /// Rows without a median price.
    pub median_price: u64,
    /// Rows without a median price per square foot.
    pub median_price_sqft: u64,
    /// Rows without median days on market.
    pub median_dom: u64,
    /// Rows without an inventory count.
    pub inventory: u64,
    /// Rows without a new listings count.
    pub new_listings: u64,
    /// Rows without a price reduced count.
    pub price_reduced: u64,
}

/// Read-only overview of what has been ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    /// Total `locations` rows.
    pub location_count: u64,
    /// First few locations by id.
    pub sample_locations: Vec<LocationRow>,
    /// Total `housing_data` rows.
    pub housing_count: u64,
    /// Housing observation date range, if any rows exist.
    pub housing_dates: Option<DateRange>,
    /// NULL counts per nullable housing column.
    pub housing_nulls: HousingNullCounts,
    /// Total `mortgage_data` rows.
    pub mortgage_count: u64,
    /// Mortgage observation date range, if any rows exist.
    pub mortgage_dates: Option<DateRange>,
}
