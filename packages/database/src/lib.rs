#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` persistence for the housing-market ingestion toolchain.
//!
//! Every function takes an explicitly opened [`duckdb::Connection`]; there is
//! no global connection. Writes that must be atomic go through
//! [`Connection::transaction`], whose guard rolls back when dropped, so a
//! failed ingest never leaves a transaction open.

pub mod db;
pub mod housing;
pub mod locations;
pub mod mortgage;
pub mod paths;
pub mod report;

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::Connection;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A location lookup key is incomplete.
    #[error("Invalid location key: {message}")]
    InvalidLocationKey {
        /// Description of what is missing.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) the database file at `path` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the directory, connection, or schema creation
/// fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens a fresh in-memory database with the schema applied.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Creates the sequences and tables if they do not exist yet.
///
/// Fact tables are unique on their observation key so that re-ingesting an
/// overlapping window inserts only the observations that are new.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS locations_id_seq;
         CREATE SEQUENCE IF NOT EXISTS housing_data_id_seq;
         CREATE SEQUENCE IF NOT EXISTS mortgage_data_id_seq;

         CREATE TABLE IF NOT EXISTS locations (
            id BIGINT PRIMARY KEY DEFAULT nextval('locations_id_seq'),
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            state_code VARCHAR(2),
            zip_code VARCHAR(5)
         );

         CREATE TABLE IF NOT EXISTS housing_data (
            id BIGINT PRIMARY KEY DEFAULT nextval('housing_data_id_seq'),
            location_id BIGINT NOT NULL REFERENCES locations (id),
            date DATE NOT NULL,
            median_price DOUBLE,
            median_price_sqft DOUBLE,
            median_dom BIGINT,
            inventory BIGINT,
            new_listings BIGINT,
            price_reduced BIGINT,
            fetched_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (location_id, date)
         );

         CREATE TABLE IF NOT EXISTS mortgage_data (
            id BIGINT PRIMARY KEY DEFAULT nextval('mortgage_data_id_seq'),
            location_id BIGINT NOT NULL REFERENCES locations (id),
            series_id TEXT NOT NULL,
            date DATE NOT NULL,
            rate_30yr_fixed DOUBLE,
            rate_15yr_fixed DOUBLE,
            rate_5yr_arm DOUBLE,
            fetched_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (location_id, series_id, date)
         );",
    )?;

    log::debug!("Database schema ready");
    Ok(())
}

/// Parses a `DuckDB` `DATE::TEXT` value (`YYYY-MM-DD`).
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DbError::Conversion {
        message: format!("invalid date {s:?}: {e}"),
    })
}

/// Parses a `DuckDB` timestamp text representation into a UTC `DateTime`.
///
/// `TIMESTAMPTZ::TEXT` renders with an offset (`2024-01-15 10:30:00.123+00`)
/// and with or without fractional seconds; plain timestamps have no offset.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    log::warn!("Failed to parse timestamp: {s:?}");
    None
}

/// Converts a `COUNT(*)` result to `u64`.
pub(crate) fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
