//! Location dimension lookups.
//!
//! Locations are keyed by (`type`, `state_code`) and created lazily the first
//! time an ingest references them. A created row is committed on its own
//! before any fact rows that point at it are staged, so it stays even if the
//! surrounding ingest later rolls back.

use std::str::FromStr as _;

use duckdb::Connection;
use housing_market_database_models::{LocationRow, NewLocation};
use housing_market_models::LocationType;

use crate::{DbError, count_to_u64};

const SELECT_COLUMNS: &str = "SELECT id, type, name, state_code, zip_code FROM locations";

type RawLocation = (i64, String, String, Option<String>, Option<String>);

fn into_row(raw: RawLocation) -> Result<LocationRow, DbError> {
    let (id, location_type, name, state_code, zip_code) = raw;
    let location_type =
        LocationType::from_str(&location_type).map_err(|e| DbError::Conversion {
            message: format!("location {id} has unknown type {location_type:?}: {e}"),
        })?;
    Ok(LocationRow {
        id,
        location_type,
        name,
        state_code,
        zip_code,
    })
}

/// Looks up a location by (`location_type`, `state_code`). State codes
/// are matched case-insensitively.
///
/// If more than one row matches (possible only after concurrent runs), the
/// oldest wins.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored type is unknown.
pub fn find_location(
    conn: &Connection,
    location_type: LocationType,
    state_code: &str,
) -> Result<Option<LocationRow>, DbError> {
    let state_code = state_code.trim().to_ascii_uppercase();
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE type = ? AND state_code = ? ORDER BY id LIMIT 1"
    ))?;
    let type_name: &str = location_type.as_ref();
    let mut rows = stmt.query(duckdb::params![type_name, state_code])?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let raw: RawLocation = (row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?);

    into_row(raw).map(Some)
}

/// Returns the existing location for (`type`, `state_code`), or inserts and
/// commits a new one. The state code is stored trimmed and uppercased.
///
/// Takes the connection mutably: the lookup and insert run in their own
/// transaction, which cannot overlap an open fact-row transaction on the same
/// connection.
///
/// # Errors
///
/// Returns [`DbError::InvalidLocationKey`] if `state_code` is blank, or
/// [`DbError`] if any query fails.
pub fn resolve_or_create(
    conn: &mut Connection,
    location: &NewLocation,
) -> Result<LocationRow, DbError> {
    let state_code = location.state_code.trim().to_ascii_uppercase();
    if state_code.is_empty() {
        return Err(DbError::InvalidLocationKey {
            message: format!("{} {:?} has no state code", location.location_type, location.name),
        });
    }

    let tx = conn.transaction()?;

    if let Some(existing) = find_location(&tx, location.location_type, &state_code)? {
        tx.commit()?;
        return Ok(existing);
    }

    let type_name: &str = location.location_type.as_ref();
    tx.execute(
        "INSERT INTO locations (type, name, state_code, zip_code) VALUES (?, ?, ?, ?)",
        duckdb::params![
            type_name,
            location.name,
            state_code,
            location.zip_code.as_deref(),
        ],
    )?;

    let created = find_location(&tx, location.location_type, &state_code)?.ok_or_else(|| {
        DbError::Conversion {
            message: format!("inserted location {state_code} was not readable"),
        }
    })?;

    tx.commit()?;

    log::info!(
        "Created {} location {} ({state_code}) with id {}",
        created.location_type,
        created.name,
        created.id
    );

    Ok(created)
}

/// Returns the number of stored locations.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
    Ok(count_to_u64(count))
}

/// Returns up to `limit` locations ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list(conn: &Connection, limit: u32) -> Result<Vec<LocationRow>, DbError> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id LIMIT ?"))?;
    let mut rows = stmt.query(duckdb::params![i64::from(limit)])?;

    let mut locations = Vec::new();
    while let Some(row) = rows.next()? {
        let raw: RawLocation = (row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?);
        locations.push(into_row(raw)?);
    }

    Ok(locations)
}
