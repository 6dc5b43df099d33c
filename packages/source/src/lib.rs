#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! External data sources for the housing-market ingestion toolchain.
//!
//! Two kinds of upstream are supported:
//!
//! - a bulk feed ([`HousingFeed`]) that ships a whole gzip-compressed TSV
//!   snapshot per download, implemented by [`redfin::RedfinStateTracker`];
//! - a per-series time-series API ([`SeriesProvider`]), implemented by
//!   [`fred::FredClient`].
//!
//! Adapters here only fetch and validate. Mapping into database rows and
//! committing is the ingestion driver's job.

pub mod fred;
pub mod parsing;
pub mod redfin;

#[cfg(test)]
mod test_server;

use async_trait::async_trait;
use chrono::NaiveDate;
use housing_market_models::MortgageSeries;
use housing_market_source_models::{SeriesObservation, StateMarketRecord};

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (decompression).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TSV/CSV parsing failed (malformed row, missing column).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field could not be converted to its typed value.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// A required credential is not configured.
    #[error("Missing credential: {var} is not set")]
    MissingCredential {
        /// Name of the environment variable that should hold it.
        var: &'static str,
    },
}

/// A bulk feed that returns a full snapshot of state-level market records.
#[async_trait]
pub trait HousingFeed: Send + Sync {
    /// Human-readable name for log messages.
    fn name(&self) -> &str;

    /// Downloads and parses the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the download fails, the server responds
    /// with a non-success status, or the snapshot cannot be parsed.
    async fn fetch_snapshot(&self) -> Result<Vec<StateMarketRecord>, SourceError>;
}

/// A time-series API queried one series at a time.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name for log messages.
    fn name(&self) -> &str;

    /// Fetches the observations of `series` dated within `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request or response parsing fails.
    async fn observations(
        &self,
        series: MortgageSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesObservation>, SourceError>;
}
