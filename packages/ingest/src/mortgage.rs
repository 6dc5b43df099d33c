//! National mortgage rate sync from a per-series time-series API.

use std::time::Instant;

use chrono::{Days, NaiveDate};
use duckdb::Connection;
use housing_market_database::{locations, mortgage as mortgage_db};
use housing_market_database_models::{NewLocation, NewMortgageData};
use housing_market_ingest_models::ImportResult;
use housing_market_models::MortgageSeries;
use housing_market_source::SeriesProvider;

use crate::IngestError;

/// Fetches every [`MortgageSeries`] over `[today - days_back, today]` and
/// stores one row per observation against the national location.
///
/// A series whose request fails is logged and skipped; the others are still
/// stored. All rows commit together.
///
/// # Errors
///
/// Returns [`IngestError`] if resolving the national location or the insert
/// fails. Nothing from this run is stored in that case.
pub async fn sync_mortgage_rates(
    conn: &mut Connection,
    provider: &dyn SeriesProvider,
    days_back: u32,
    today: NaiveDate,
) -> Result<ImportResult, IngestError> {
    let start = Instant::now();
    let name = provider.name();
    let window_start = today
        .checked_sub_days(Days::new(u64::from(days_back)))
        .unwrap_or(NaiveDate::MIN);
    log::info!("Syncing mortgage rates from {name} for {window_start}..={today}");

    let national = locations::resolve_or_create(conn, &NewLocation::national())?;

    let mut rows = Vec::new();
    let mut records_fetched = 0u64;
    for &series in MortgageSeries::all() {
        match provider.observations(series, window_start, today).await {
            Ok(observations) => {
                log::info!(
                    "{name}: {} observations for {series} ({})",
                    observations.len(),
                    series.description()
                );
                records_fetched += u64::try_from(observations.len()).unwrap_or(u64::MAX);
                rows.extend(observations.iter().map(|o| {
                    NewMortgageData::from_observation(national.id, series, o.date, o.value)
                }));
            }
            Err(e) => {
                log::warn!("{name}: skipping {series}: {e}");
            }
        }
    }

    let records_inserted = mortgage_db::insert_rows(conn, &rows)?;

    Ok(ImportResult {
        source_name: name.to_string(),
        records_fetched,
        records_inserted,
        records_skipped: records_fetched.saturating_sub(records_inserted),
        duration: start.elapsed(),
    })
}

/// Runs [`sync_mortgage_rates`] and reports whether it succeeded. Never
/// returns an error; failures are logged.
pub async fn fetch_and_store_mortgage_rates(
    conn: &mut Connection,
    provider: &dyn SeriesProvider,
    days_back: u32,
    today: NaiveDate,
) -> bool {
    match sync_mortgage_rates(conn, provider, days_back, today).await {
        Ok(result) => {
            log::info!(
                "{}: stored {} new rate observations ({} fetched) in {:.1}s",
                result.source_name,
                result.records_inserted,
                result.records_fetched,
                result.duration.as_secs_f64()
            );
            true
        }
        Err(e) => {
            log::error!("{}: mortgage rate sync failed: {e}", provider.name());
            false
        }
    }
}
