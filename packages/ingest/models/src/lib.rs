#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion options and result types.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use housing_market_models::FreshnessPolicy;
use serde::{Deserialize, Serialize};

/// Rows per committed chunk when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Property type kept when none is configured. The feed publishes one row
/// per property type for each (state, period); this is the aggregate one.
pub const DEFAULT_PROPERTY_TYPE: &str = "All Residential";

/// Look-back window of the mortgage-rate sync when none is configured.
pub const DEFAULT_DAYS_BACK: u32 = 365;

/// Options for a bulk-feed housing sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingSyncOptions {
    /// What to do when the freshness check cannot reach or parse upstream.
    pub freshness_policy: FreshnessPolicy,
    /// Upper-cased state codes to keep. Empty keeps every state.
    pub states: BTreeSet<String>,
    /// Only keep records of this property type (case-insensitive). `None`
    /// keeps every type, in which case the first row stored for a
    /// (state, period) wins.
    pub property_type: Option<String>,
    /// Rows per committed transaction; `None` stages everything in one.
    pub chunk_size: Option<usize>,
}

impl Default for HousingSyncOptions {
    fn default() -> Self {
        Self {
            freshness_policy: FreshnessPolicy::default(),
            states: BTreeSet::new(),
            property_type: Some(DEFAULT_PROPERTY_TYPE.to_string()),
            chunk_size: Some(DEFAULT_CHUNK_SIZE),
        }
    }
}

impl HousingSyncOptions {
    /// Restricts the sync to the given state codes. Codes are trimmed and
    /// upper-cased; blanks are ignored.
    #[must_use]
    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.states = states
            .into_iter()
            .map(|s| s.as_ref().trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// Whether `state_code` passes the state allow-list.
    #[must_use]
    pub fn allows_state(&self, state_code: &str) -> bool {
        self.states.is_empty() || self.states.contains(&state_code.trim().to_ascii_uppercase())
    }

    /// Whether a record's property type passes the property-type filter.
    #[must_use]
    pub fn allows_property_type(&self, property_type: Option<&str>) -> bool {
        self.property_type.as_deref().is_none_or(|wanted| {
            property_type.is_some_and(|actual| actual.trim().eq_ignore_ascii_case(wanted.trim()))
        })
    }
}

/// Result of a completed import operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// Name of the data source that was imported.
    pub source_name: String,
    /// Total number of records fetched from the source.
    pub records_fetched: u64,
    /// Number of new records inserted into the database.
    pub records_inserted: u64,
    /// Number of records skipped (filtered out, unkeyable, or already
    /// stored).
    pub records_skipped: u64,
    /// How long the import took.
    pub duration: Duration,
}

/// Why a housing sync ended without importing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Upstream has nothing newer than what is stored.
    UpToDate {
        /// Latest stored observation date.
        stored_through: NaiveDate,
        /// Latest upstream observation date, if the snapshot had any rows.
        remote_through: Option<NaiveDate>,
    },
    /// The freshness check failed under [`FreshnessPolicy::FailClosed`].
    FreshnessCheckFailed {
        /// The underlying error.
        message: String,
    },
}

/// Outcome of a housing sync that did not fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOutcome {
    /// New data was downloaded and stored.
    Imported(ImportResult),
    /// The run was skipped.
    Skipped(SkipReason),
}
