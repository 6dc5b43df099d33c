#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared domain types for the housing-market ingestion toolchain.
//!
//! Defines the geographic [`LocationType`] used to key every stored
//! observation, the FRED [`MortgageSeries`] the rate adapter pulls, and the
//! [`FreshnessPolicy`] that governs what the bulk-feed adapter does when it
//! cannot tell whether upstream has new data.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Two-letter code of the single national location.
pub const NATIONAL_STATE_CODE: &str = "US";

/// Display name of the single national location.
pub const NATIONAL_NAME: &str = "United States";

/// Granularity of a location dimension row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LocationType {
    /// A US state (or DC).
    State,
    /// A county within a state.
    County,
    /// A city or census place.
    City,
    /// A five-digit ZIP code area.
    Zip,
    /// A whole country.
    Country,
}

/// A FRED mortgage-rate series.
///
/// Each series populates exactly one rate column of a stored mortgage row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum MortgageSeries {
    /// 30-year fixed rate mortgage average.
    #[serde(rename = "MORTGAGE30US")]
    #[strum(serialize = "MORTGAGE30US")]
    ThirtyYearFixed,
    /// 15-year fixed rate mortgage average.
    #[serde(rename = "MORTGAGE15US")]
    #[strum(serialize = "MORTGAGE15US")]
    FifteenYearFixed,
    /// 5/1-year adjustable rate mortgage average.
    #[serde(rename = "MORTGAGE5US")]
    #[strum(serialize = "MORTGAGE5US")]
    FiveYearArm,
}

impl MortgageSeries {
    /// Returns every series the rate adapter requests, in request order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::ThirtyYearFixed, Self::FifteenYearFixed, Self::FiveYearArm]
    }

    /// The FRED series identifier (e.g. `"MORTGAGE30US"`).
    #[must_use]
    pub const fn series_id(self) -> &'static str {
        match self {
            Self::ThirtyYearFixed => "MORTGAGE30US",
            Self::FifteenYearFixed => "MORTGAGE15US",
            Self::FiveYearArm => "MORTGAGE5US",
        }
    }

    /// Human-readable series title as published by FRED.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ThirtyYearFixed => "30-Year Fixed Rate Mortgage Average",
            Self::FifteenYearFixed => "15-Year Fixed Rate Mortgage Average",
            Self::FiveYearArm => "5/1-Year Adjustable Rate Mortgage Average",
        }
    }
}

/// What the bulk-feed adapter does when its freshness check fails (network
/// error or unparseable snapshot) while stored data already exists.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FreshnessPolicy {
    /// Assume new data is available and attempt the download anyway.
    #[default]
    FailOpen,
    /// Assume nothing changed and skip the run.
    FailClosed,
}
