//! Read-only aggregates for inspecting what has been ingested.

use duckdb::Connection;
use housing_market_database_models::{DatabaseSummary, HousingDataRow, MortgageDataRow};
use housing_market_models::{LocationType, NATIONAL_STATE_CODE};

use crate::{DbError, housing, locations, mortgage};

/// Number of locations included in [`DatabaseSummary::sample_locations`].
pub const SAMPLE_LOCATIONS: u32 = 5;

/// Collects row counts, date ranges, and NULL counts across all tables.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub fn summarize(conn: &Connection) -> Result<DatabaseSummary, DbError> {
    Ok(DatabaseSummary {
        location_count: locations::count(conn)?,
        sample_locations: locations::list(conn, SAMPLE_LOCATIONS)?,
        housing_count: housing::count(conn)?,
        housing_dates: housing::date_range(conn)?,
        housing_nulls: housing::null_counts(conn)?,
        mortgage_count: mortgage::count(conn)?,
        mortgage_dates: mortgage::date_range(conn)?,
    })
}

/// Returns the `limit` most recent housing rows for a state, newest first.
/// An unknown state yields an empty list.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub fn latest_housing_for_state(
    conn: &Connection,
    state_code: &str,
    limit: u32,
) -> Result<Vec<HousingDataRow>, DbError> {
    let code = state_code.trim().to_ascii_uppercase();
    match locations::find_location(conn, LocationType::State, &code)? {
        Some(location) => housing::latest_for_location(conn, location.id, limit),
        None => Ok(Vec::new()),
    }
}

/// Returns the `limit` most recent national mortgage rows, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub fn latest_national_mortgage(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<MortgageDataRow>, DbError> {
    match locations::find_location(conn, LocationType::Country, NATIONAL_STATE_CODE)? {
        Some(location) => mortgage::latest_for_location(conn, location.id, limit),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use housing_market_database_models::{DateRange, NewHousingData, NewLocation, NewMortgageData};
    use housing_market_models::MortgageSeries;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_database_summary() {
        let conn = crate::open_in_memory().unwrap();

        let summary = summarize(&conn).unwrap();

        assert_eq!(summary.location_count, 0);
        assert!(summary.sample_locations.is_empty());
        assert_eq!(summary.housing_count, 0);
        assert_eq!(summary.housing_dates, None);
        assert_eq!(summary.mortgage_count, 0);
        assert_eq!(summary.mortgage_dates, None);
        assert!(latest_national_mortgage(&conn, 5).unwrap().is_empty());
    }

    #[test]
    fn summary_reflects_ingested_rows() {
        let mut conn = crate::open_in_memory().unwrap();
        let codes = ["CA", "TX", "NY", "FL", "WA", "OR"];
        let mut ids = Vec::new();
        for code in codes {
            ids.push(locations::resolve_or_create(&mut conn, &NewLocation::state(code, code)).unwrap().id);
        }
        let us = locations::resolve_or_create(&mut conn, &NewLocation::national()).unwrap();

        let housing_rows = [
            NewHousingData {
                location_id: ids[0],
                date: date(2024, 1, 31),
                median_price: Some(800_000.0),
                median_price_sqft: None,
                median_dom: Some(25),
                inventory: None,
                new_listings: Some(1),
                price_reduced: Some(1),
            },
            NewHousingData {
                location_id: ids[1],
                date: date(2024, 2, 29),
                median_price: Some(350_000.0),
                median_price_sqft: Some(180.0),
                median_dom: Some(40),
                inventory: Some(9),
                new_listings: Some(2),
                price_reduced: Some(2),
            },
        ];
        housing::insert_rows(&mut conn, &housing_rows, None).unwrap();
        mortgage::insert_rows(
            &mut conn,
            &[NewMortgageData::from_observation(
                us.id,
                MortgageSeries::ThirtyYearFixed,
                date(2024, 1, 4),
                6.62,
            )],
        )
        .unwrap();

        let summary = summarize(&conn).unwrap();

        assert_eq!(summary.location_count, 7);
        assert_eq!(summary.sample_locations.len(), SAMPLE_LOCATIONS as usize);
        assert_eq!(summary.housing_count, 2);
        assert_eq!(
            summary.housing_dates,
            Some(DateRange {
                start: date(2024, 1, 31),
                end: date(2024, 2, 29),
            })
        );
        assert_eq!(summary.housing_nulls.median_price_sqft, 1);
        assert_eq!(summary.housing_nulls.inventory, 1);
        assert_eq!(summary.housing_nulls.median_price, 0);
        assert_eq!(summary.mortgage_count, 1);

        let texas = latest_housing_for_state(&conn, "tx", 10).unwrap();
        assert_eq!(texas.len(), 1);
        assert_eq!(texas[0].median_price, Some(350_000.0));
        assert!(latest_housing_for_state(&conn, "ZZ", 10).unwrap().is_empty());

        let rates = latest_national_mortgage(&conn, 10).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].rate_30yr_fixed, Some(6.62));
    }
}
