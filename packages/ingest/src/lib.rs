#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for ingesting housing market and mortgage rate data into the
//! `DuckDB` database.
//!
//! Each sync resolves the locations it needs, maps upstream records into
//! fact rows, and commits. The `sync_*` functions return typed results; the
//! `fetch_and_store_*` wrappers log the outcome and collapse it into a
//! success flag for the CLI and external schedulers.

pub mod housing;
pub mod mortgage;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::NaiveDate;
use housing_market_database::DbError;
use housing_market_source::SourceError;

pub use housing::{fetch_and_store_housing, sync_housing};
pub use mortgage::{fetch_and_store_mortgage_rates, sync_mortgage_rates};

/// Errors that abort a sync.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Persistence failed; the open transaction was rolled back.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Downloading or parsing upstream data failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Whether upstream holds data newer than what is stored.
///
/// An empty store always needs data. A snapshot without any dated rows never
/// counts as newer.
#[must_use]
pub fn has_new_data(stored_through: Option<NaiveDate>, remote_through: Option<NaiveDate>) -> bool {
    match (stored_through, remote_through) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(stored), Some(remote)) => remote > stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_store_always_needs_data() {
        assert!(has_new_data(None, None));
        assert!(has_new_data(None, Some(date(2020, 1, 31))));
    }

    #[test]
    fn only_strictly_newer_remote_counts() {
        let stored = Some(date(2024, 1, 31));
        assert!(has_new_data(stored, Some(date(2024, 2, 29))));
        assert!(!has_new_data(stored, Some(date(2024, 1, 31))));
        assert!(!has_new_data(stored, Some(date(2023, 12, 31))));
        assert!(!has_new_data(stored, None));
    }
}
