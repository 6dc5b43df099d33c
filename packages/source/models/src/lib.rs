#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed records produced by the external data sources.
//!
//! Source adapters validate upstream rows at the parse boundary and hand
//! these records to the ingestion drivers, which map them into database
//! rows. Numeric fields that the upstream left blank stay `None` all the way
//! through to the stored row.

use chrono::NaiveDate;
use housing_market_models::MortgageSeries;
use serde::{Deserialize, Serialize};

/// One row of the state-level market tracker bulk feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMarketRecord {
    /// Last day of the period this row summarizes.
    pub period_end: NaiveDate,
    /// Full state name (e.g. "California").
    pub state: String,
    /// Two-letter state code (e.g. "CA"), upper-cased.
    pub state_code: String,
    /// Property type the row aggregates (e.g. "All Residential"), if the feed
    /// carries the column.
    pub property_type: Option<String>,
    /// Median sale price.
    pub median_sale_price: Option<f64>,
    /// Median sale price per square foot.
    pub median_ppsf: Option<f64>,
    /// Median days on market.
    pub median_dom: Option<i64>,
    /// Active listing count.
    pub inventory: Option<i64>,
    /// Newly listed home count.
    pub new_listings: Option<i64>,
    /// Listings with a price drop.
    pub price_drops: Option<i64>,
}

/// A single dated value from a time-series provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesObservation {
    /// Series the value belongs to.
    pub series: MortgageSeries,
    /// Observation date.
    pub date: NaiveDate,
    /// Observed rate, in percent.
    pub value: f64,
}

/// Returns the latest `period_end` across a snapshot, or `None` if the
/// snapshot is empty.
#[must_use]
pub fn latest_period(records: &[StateMarketRecord]) -> Option<NaiveDate> {
    records.iter().map(|r| r.period_end).max()
}
