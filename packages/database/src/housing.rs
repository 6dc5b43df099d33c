//! `housing_data` fact table operations.

use duckdb::Connection;
use housing_market_database_models::{DateRange, HousingDataRow, HousingNullCounts, NewHousingData};

use crate::{DbError, count_to_u64, parse_date, parse_timestamp};

const INSERT_SQL: &str = "INSERT INTO housing_data (
        location_id, date, median_price, median_price_sqft,
        median_dom, inventory, new_listings, price_reduced
    ) VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?)
    ON CONFLICT DO NOTHING";

/// Returns the latest stored observation date, or `None` if the table is
/// empty.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn max_date(conn: &Connection) -> Result<Option<chrono::NaiveDate>, DbError> {
    let max: Option<String> =
        conn.query_row("SELECT MAX(date)::TEXT FROM housing_data", [], |row| {
            row.get(0)
        })?;

    max.as_deref().map(parse_date).transpose()
}

/// Inserts `rows`, committing every `chunk_size` rows.
///
/// With `chunk_size` of `None` every row is staged in a single transaction,
/// so a failure leaves nothing behind. With chunking, a failure rolls back
/// only the open chunk; chunks that already committed remain. Rows whose
/// (`location_id`, `date`) is already stored are skipped.
///
/// Returns the number of rows actually inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert or commit fails.
pub fn insert_rows(
    conn: &mut Connection,
    rows: &[NewHousingData],
    chunk_size: Option<usize>,
) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let chunk_size = chunk_size.filter(|&n| n > 0).unwrap_or(rows.len());
    let chunk_count = rows.len().div_ceil(chunk_size);
    let mut total_inserted = 0u64;

    for (i, chunk) in rows.chunks(chunk_size).enumerate() {
        let tx = conn.transaction()?;
        let mut inserted = 0u64;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for row in chunk {
                let changed = stmt.execute(duckdb::params![
                    row.location_id,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.median_price,
                    row.median_price_sqft,
                    row.median_dom,
                    row.inventory,
                    row.new_listings,
                    row.price_reduced,
                ])?;
                inserted += u64::try_from(changed).unwrap_or(0);
            }
        }
        tx.commit()?;

        total_inserted += inserted;
        log::debug!(
            "Committed housing chunk {}/{chunk_count}: {inserted} of {} rows inserted",
            i + 1,
            chunk.len()
        );
    }

    Ok(total_inserted)
}

/// Returns the number of stored housing rows.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM housing_data", [], |row| row.get(0))?;
    Ok(count_to_u64(count))
}

/// Returns the earliest and latest observation dates.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn date_range(conn: &Connection) -> Result<Option<DateRange>, DbError> {
    let (start, end): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(date)::TEXT, MAX(date)::TEXT FROM housing_data",
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

/// Counts NULLs in every nullable measure column.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn null_counts(conn: &Connection) -> Result<HousingNullCounts, DbError> {
    let counts: [i64; 6] = conn.query_row(
        "SELECT
            COUNT(*) - COUNT(median_price),
            COUNT(*) - COUNT(median_price_sqft),
            COUNT(*) - COUNT(median_dom),
            COUNT(*) - COUNT(inventory),
            COUNT(*) - COUNT(new_listings),
            COUNT(*) - COUNT(price_reduced)
         FROM housing_data",
        [],
        |row| {
            Ok([
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ])
        },
    )?;

    Ok(HousingNullCounts {
        median_price: count_to_u64(counts[0]),
        median_price_sqft: count_to_u64(counts[1]),
        median_dom: count_to_u64(counts[2]),
        inventory: count_to_u64(counts[3]),
        new_listings: count_to_u64(counts[4]),
        price_reduced: count_to_u64(counts[5]),
    })
}

/// Returns the `limit` most recent rows for a location, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date is malformed.
pub fn latest_for_location(
    conn: &Connection,
    location_id: i64,
    limit: u32,
) -> Result<Vec<HousingDataRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, location_id, date::TEXT, median_price, median_price_sqft,
                median_dom, inventory, new_listings, price_reduced, fetched_at::TEXT
         FROM housing_data
         WHERE location_id = ?
         ORDER BY date DESC
         LIMIT ?",
    )?;
    let mut rows = stmt.query(duckdb::params![location_id, i64::from(limit)])?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let date: String = row.get(2)?;
        let fetched_at: Option<String> = row.get(9)?;
        result.push(HousingDataRow {
            id: row.get(0)?,
            location_id: row.get(1)?,
            date: parse_date(&date)?,
            median_price: row.get(3)?,
            median_price_sqft: row.get(4)?,
            median_dom: row.get(5)?,
            inventory: row.get(6)?,
            new_listings: row.get(7)?,
            price_reduced: row.get(8)?,
            fetched_at: fetched_at.as_deref().and_then(parse_timestamp),
        });
    }

    Ok(result)
}
