//! `mortgage_data` fact table operations.

use std::str::FromStr as _;

use duckdb::Connection;
use housing_market_database_models::{DateRange, MortgageDataRow, NewMortgageData};
use housing_market_models::MortgageSeries;

use crate::{DbError, count_to_u64, parse_date, parse_timestamp};

/// Inserts every row in a single transaction.
///
/// Rows whose (`location_id`, `series_id`, `date`) is already stored are
/// skipped. Returns the number of rows actually inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert or the commit fails. Nothing is kept in
/// that case.
pub fn insert_rows(conn: &mut Connection, rows: &[NewMortgageData]) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut inserted = 0u64;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO mortgage_data (
                location_id, series_id, date,
                rate_30yr_fixed, rate_15yr_fixed, rate_5yr_arm
            ) VALUES (?, ?, CAST(? AS DATE), ?, ?, ?)
            ON CONFLICT DO NOTHING",
        )?;
        for row in rows {
            let changed = stmt.execute(duckdb::params![
                row.location_id,
                row.series.series_id(),
                row.date.format("%Y-%m-%d").to_string(),
                row.rate_30yr_fixed,
                row.rate_15yr_fixed,
                row.rate_5yr_arm,
            ])?;
            inserted += u64::try_from(changed).unwrap_or(0);
        }
    }
    tx.commit()?;

    log::debug!("Committed {inserted} of {} mortgage rows", rows.len());
    Ok(inserted)
}

/// Returns the number of stored mortgage rows.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM mortgage_data", [], |row| row.get(0))?;
    Ok(count_to_u64(count))
}

/// Returns the earliest and latest observation dates across all series.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn date_range(conn: &Connection) -> Result<Option<DateRange>, DbError> {
    let (start, end): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(date)::TEXT, MAX(date)::TEXT FROM mortgage_data",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateRange {
            start: parse_date(&start)?,
            end: parse_date(&end)?,
        })),
        _ => Ok(None),
    }
}

/// Returns the `limit` most recent rows for a location, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored value is malformed.
pub fn latest_for_location(
    conn: &Connection,
    location_id: i64,
    limit: u32,
) -> Result<Vec<MortgageDataRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, location_id, series_id, date::TEXT,
                rate_30yr_fixed, rate_15yr_fixed, rate_5yr_arm, fetched_at::TEXT
         FROM mortgage_data
         WHERE location_id = ?
         ORDER BY date DESC, series_id
         LIMIT ?",
    )?;
    let mut rows = stmt.query(duckdb::params![location_id, i64::from(limit)])?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let series_id: String = row.get(2)?;
        let date: String = row.get(3)?;
        let fetched_at: Option<String> = row.get(7)?;

        let series = MortgageSeries::from_str(&series_id).map_err(|e| DbError::Conversion {
            message: format!("unknown mortgage series {series_id:?}: {e}"),
        })?;

        result.push(MortgageDataRow {
            id: row.get(0)?,
            location_id: row.get(1)?,
            series,
            date: parse_date(&date)?,
            rate_30yr_fixed: row.get(4)?,
            rate_15yr_fixed: row.get(5)?,
            rate_5yr_arm: row.get(6)?,
            fetched_at: fetched_at.as_deref().and_then(parse_timestamp),
        });
    }

    Ok(result)
}
