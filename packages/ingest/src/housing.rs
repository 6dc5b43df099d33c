//! State-level housing market sync from a bulk snapshot feed.
//!
//! A run checks freshness against the latest stored observation, and only
//! when upstream has moved on does it filter the snapshot, resolve the states
//! it mentions, and insert one `housing_data` row per record. The snapshot
//! downloaded for the freshness check is the one that gets ingested.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use duckdb::Connection;
use housing_market_database::{housing as housing_db, locations};
use housing_market_database_models::{NewHousingData, NewLocation};
use housing_market_ingest_models::{HousingSyncOptions, ImportResult, SkipReason, SyncOutcome};
use housing_market_models::FreshnessPolicy;
use housing_market_source::HousingFeed;
use housing_market_source_models::{StateMarketRecord, latest_period};

use crate::{IngestError, has_new_data};

/// Runs one housing sync.
///
/// # Errors
///
/// Returns [`IngestError`] if the download, parse, location resolution, or
/// insert fails. Under chunked inserts, chunks committed before the failure
/// remain stored.
pub async fn sync_housing(
    conn: &mut Connection,
    feed: &dyn HousingFeed,
    opts: &HousingSyncOptions,
) -> Result<SyncOutcome, IngestError> {
    let start = Instant::now();
    let name = feed.name();
    log::info!("Syncing housing data from {name}");

    let Some(stored_through) = housing_db::max_date(conn)? else {
        log::info!("{name}: no stored housing data, running full ingest");
        let snapshot = feed.fetch_snapshot().await?;
        return store_snapshot(conn, name, snapshot, opts, start).map(SyncOutcome::Imported);
    };

    let snapshot = match feed.fetch_snapshot().await {
        Ok(snapshot) => {
            let remote_through = latest_period(&snapshot);
            if !has_new_data(Some(stored_through), remote_through) {
                log::info!(
                    "{name}: up to date (stored through {stored_through}, upstream through {})",
                    remote_through.map_or_else(|| "nothing".to_string(), |d| d.to_string())
                );
                return Ok(SyncOutcome::Skipped(SkipReason::UpToDate {
                    stored_through,
                    remote_through,
                }));
            }
            log::info!(
                "{name}: new data available (stored through {stored_through}, upstream through {})",
                remote_through.map_or_else(String::new, |d| d.to_string())
            );
            snapshot
        }
        Err(e) => match opts.freshness_policy {
            FreshnessPolicy::FailOpen => {
                log::warn!("{name}: freshness check failed ({e}), downloading anyway");
                feed.fetch_snapshot().await?
            }
            FreshnessPolicy::FailClosed => {
                log::warn!("{name}: freshness check failed ({e}), skipping run");
                return Ok(SyncOutcome::Skipped(SkipReason::FreshnessCheckFailed {
                    message: e.to_string(),
                }));
            }
        },
    };

    store_snapshot(conn, name, snapshot, opts, start).map(SyncOutcome::Imported)
}

/// Runs [`sync_housing`] and reports whether it succeeded. A skipped run is a
/// success. Never returns an error; failures are logged.
pub async fn fetch_and_store_housing(
    conn: &mut Connection,
    feed: &dyn HousingFeed,
    opts: &HousingSyncOptions,
) -> bool {
    match sync_housing(conn, feed, opts).await {
        Ok(SyncOutcome::Imported(result)) => {
            log::info!(
                "{}: stored {} new rows ({} fetched, {} skipped) in {:.1}s",
                result.source_name,
                result.records_inserted,
                result.records_fetched,
                result.records_skipped,
                result.duration.as_secs_f64()
            );
            true
        }
        Ok(SyncOutcome::Skipped(reason)) => {
            log::info!("{}: nothing to ingest ({reason:?})", feed.name());
            true
        }
        Err(e) => {
            log::error!("{}: housing sync failed: {e}", feed.name());
            false
        }
    }
}

fn store_snapshot(
    conn: &mut Connection,
    source_name: &str,
    snapshot: Vec<StateMarketRecord>,
    opts: &HousingSyncOptions,
    start: Instant,
) -> Result<ImportResult, IngestError> {
    let records_fetched = u64::try_from(snapshot.len()).unwrap_or(u64::MAX);

    let mut unkeyed = 0u64;
    let selected: Vec<StateMarketRecord> = snapshot
        .into_iter()
        .filter(|r| opts.allows_state(&r.state_code))
        .filter(|r| opts.allows_property_type(r.property_type.as_deref()))
        .filter(|r| {
            if r.state_code.trim().is_empty() {
                log::warn!(
                    "{source_name}: skipping {} row for {:?} without a state code",
                    r.period_end,
                    r.state
                );
                unkeyed += 1;
                false
            } else {
                true
            }
        })
        .collect();

    log::info!(
        "{source_name}: {} of {records_fetched} records selected",
        selected.len()
    );

    let mut states: BTreeMap<&str, &str> = BTreeMap::new();
    for record in &selected {
        states
            .entry(record.state_code.as_str())
            .or_insert(record.state.as_str());
    }

    let mut location_ids: BTreeMap<&str, i64> = BTreeMap::new();
    for (&code, &state) in &states {
        let location = locations::resolve_or_create(conn, &NewLocation::state(state, code))?;
        location_ids.insert(code, location.id);
    }
    log::debug!("{source_name}: resolved {} state locations", location_ids.len());

    let mut rows: Vec<NewHousingData> = selected
        .iter()
        .filter_map(|r| {
            location_ids
                .get(r.state_code.as_str())
                .map(|&location_id| to_housing_row(location_id, r))
        })
        .collect();

    let mut keys = BTreeSet::new();
    let duplicates = rows
        .iter()
        .filter(|r| !keys.insert((r.location_id, r.date)))
        .count();
    if duplicates > 0 {
        log::warn!(
            "{source_name}: {duplicates} rows share a (state, period) with an earlier row and \
             will be dropped; set a property type to choose which one is kept"
        );
    }

    // Oldest periods commit first so a failed chunk never leaves MAX(date)
    // ahead of rows that were not stored.
    rows.sort_by_key(|r| r.date);

    let records_inserted = match housing_db::insert_rows(conn, &rows, opts.chunk_size) {
        Ok(inserted) => inserted,
        Err(e) => {
            if opts.chunk_size.is_some_and(|n| n > 0 && n < rows.len()) {
                log::warn!(
                    "{source_name}: insert failed; chunks committed before the failure remain stored"
                );
            }
            return Err(e.into());
        }
    };

    if unkeyed > 0 {
        log::warn!("{source_name}: {unkeyed} rows had no state code");
    }

    Ok(ImportResult {
        source_name: source_name.to_string(),
        records_fetched,
        records_inserted,
        records_skipped: records_fetched.saturating_sub(records_inserted),
        duration: start.elapsed(),
    })
}

const fn to_housing_row(location_id: i64, record: &StateMarketRecord) -> NewHousingData {
    NewHousingData {
        location_id,
        date: record.period_end,
        median_price: record.median_sale_price,
        median_price_sqft: record.median_ppsf,
        median_dom: record.median_dom,
        inventory: record.inventory,
        new_listings: record.new_listings,
        price_reduced: record.price_drops,
    }
}

#[cfg(test)]
mod tests {
    use housing_market_database::report;
    use housing_market_models::LocationType;

    use super::*;
    use crate::test_support::{FakeFeed, date, record};

    fn db() -> Connection {
        housing_market_database::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn empty_database_ingests_every_state() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        let mut ca = record(jan, "California", "CA");
        ca.median_sale_price = Some(800_000.0);
        let mut tx = record(jan, "Texas", "TX");
        tx.median_sale_price = Some(350_000.0);
        let feed = FakeFeed::serving(vec![ca, tx]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        let SyncOutcome::Imported(result) = outcome else {
            panic!("expected an import, got {outcome:?}");
        };
        assert_eq!(result.records_fetched, 2);
        assert_eq!(result.records_inserted, 2);
        assert_eq!(feed.calls(), 1);

        let summary = report::summarize(&conn).unwrap();
        assert_eq!(summary.location_count, 2);
        assert!(
            summary
                .sample_locations
                .iter()
                .all(|l| l.location_type == LocationType::State)
        );
        let california = report::latest_housing_for_state(&conn, "CA", 5).unwrap();
        assert_eq!(california.len(), 1);
        assert_eq!(california[0].date, jan);
        assert_eq!(california[0].median_price, Some(800_000.0));
        let texas = report::latest_housing_for_state(&conn, "TX", 5).unwrap();
        assert_eq!(texas[0].median_price, Some(350_000.0));
    }

    #[tokio::test]
    async fn skips_when_upstream_is_not_newer() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        seed_async(&mut conn, jan).await;
        let feed = FakeFeed::serving(vec![record(jan, "Texas", "TX")]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::Skipped(SkipReason::UpToDate {
                stored_through,
                remote_through: Some(remote),
            }) if stored_through == jan && remote == jan
        ));
        assert_eq!(housing_db::count(&conn).unwrap(), 1);
        assert_eq!(feed.calls(), 1);
    }

    #[tokio::test]
    async fn ingests_newer_snapshot_without_second_download() {
        let mut conn = db();
        seed_async(&mut conn, date(2024, 1, 31)).await;
        let feed = FakeFeed::serving(vec![
            record(date(2024, 1, 31), "Ohio", "OH"),
            record(date(2024, 2, 29), "Ohio", "OH"),
        ]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        let SyncOutcome::Imported(result) = outcome else {
            panic!("expected an import, got {outcome:?}");
        };
        assert_eq!(feed.calls(), 1);
        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.records_skipped, 1);
        assert_eq!(
            housing_db::max_date(&conn).unwrap(),
            Some(date(2024, 2, 29))
        );
    }

    #[tokio::test]
    async fn fail_open_downloads_again_after_failed_check() {
        let mut conn = db();
        seed_async(&mut conn, date(2024, 1, 31)).await;
        let feed = FakeFeed::new(vec![
            Err("connection reset".to_string()),
            Ok(vec![record(date(2024, 2, 29), "Ohio", "OH")]),
        ]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Imported(_)));
        assert_eq!(feed.calls(), 2);
        assert_eq!(housing_db::count(&conn).unwrap(), 2);
    }

    #[tokio::test]
    async fn fail_open_download_failure_is_an_error() {
        let mut conn = db();
        seed_async(&mut conn, date(2024, 1, 31)).await;
        let feed = FakeFeed::new(vec![
            Err("connection reset".to_string()),
            Err("connection reset".to_string()),
        ]);

        let ok = fetch_and_store_housing(&mut conn, &feed, &HousingSyncOptions::default()).await;

        assert!(!ok);
        assert_eq!(housing_db::count(&conn).unwrap(), 1);
    }

    #[tokio::test]
    async fn fail_closed_skips_after_failed_check() {
        let mut conn = db();
        seed_async(&mut conn, date(2024, 1, 31)).await;
        let feed = FakeFeed::new(vec![Err("bad gzip".to_string())]);
        let opts = HousingSyncOptions {
            freshness_policy: FreshnessPolicy::FailClosed,
            ..HousingSyncOptions::default()
        };

        let outcome = sync_housing(&mut conn, &feed, &opts).await.unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::Skipped(SkipReason::FreshnessCheckFailed { .. })
        ));
        assert_eq!(feed.calls(), 1);

        let failing = FakeFeed::new(vec![Err("bad gzip".to_string())]);
        assert!(fetch_and_store_housing(&mut conn, &failing, &opts).await);
    }

    #[tokio::test]
    async fn state_filter_limits_rows_and_locations() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        let feed = FakeFeed::serving(vec![
            record(jan, "California", "CA"),
            record(jan, "Texas", "TX"),
            record(jan, "New York", "NY"),
        ]);
        let opts = HousingSyncOptions::default().with_states(["ca", "ny"]);

        let outcome = sync_housing(&mut conn, &feed, &opts).await.unwrap();

        let SyncOutcome::Imported(result) = outcome else {
            panic!("expected an import, got {outcome:?}");
        };
        assert_eq!(result.records_inserted, 2);
        assert_eq!(result.records_skipped, 1);
        assert_eq!(locations::count(&conn).unwrap(), 2);
        assert!(
            locations::find_location(&conn, LocationType::State, "TX")
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn property_type_filter_keeps_matching_rows() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        let mut condo = record(jan, "Texas", "TX");
        condo.property_type = Some("Condo/Co-op".to_string());
        let feed = FakeFeed::serving(vec![record(jan, "Texas", "TX"), condo]);
        let opts = HousingSyncOptions {
            property_type: Some("all residential".to_string()),
            ..HousingSyncOptions::default()
        };

        assert!(fetch_and_store_housing(&mut conn, &feed, &opts).await);
        assert_eq!(housing_db::count(&conn).unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_values_are_stored_as_null_and_unkeyed_rows_skipped() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        let mut sparse = record(jan, "Texas", "TX");
        sparse.median_sale_price = None;
        sparse.inventory = None;
        let unkeyed = record(jan, "Nowhere", "");
        let feed = FakeFeed::serving(vec![sparse, unkeyed]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        let SyncOutcome::Imported(result) = outcome else {
            panic!("expected an import, got {outcome:?}");
        };
        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.records_skipped, 1);
        let texas = report::latest_housing_for_state(&conn, "TX", 1).unwrap();
        assert_eq!(texas[0].median_price, None);
        assert_eq!(texas[0].inventory, None);
        assert_eq!(texas[0].median_dom, Some(30));
    }

    #[tokio::test]
    async fn default_options_store_the_all_residential_row() {
        let mut conn = db();
        let jan = date(2024, 1, 31);
        let mut condo = record(jan, "California", "CA");
        condo.property_type = Some("Condo/Co-op".to_string());
        condo.median_sale_price = Some(500_000.0);
        let mut all = record(jan, "California", "CA");
        all.median_sale_price = Some(900_000.0);
        let feed = FakeFeed::serving(vec![condo, all]);

        let outcome = sync_housing(&mut conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();

        let SyncOutcome::Imported(result) = outcome else {
            panic!("expected an import, got {outcome:?}");
        };
        assert_eq!(result.records_inserted, 1);
        let california = report::latest_housing_for_state(&conn, "CA", 5).unwrap();
        assert_eq!(california.len(), 1);
        assert_eq!(california[0].median_price, Some(900_000.0));
    }

    /// Swaps in a `housing_data` table that rejects prices of a million or
    /// more, so a chosen row fails mid-insert.
    fn cap_median_price(conn: &Connection) {
        conn.execute_batch(
            "DROP TABLE housing_data;
             CREATE TABLE housing_data (id BIGINT, location_id BIGINT, date DATE,
                median_price DOUBLE CHECK (median_price < 1000000),
                median_price_sqft DOUBLE, median_dom BIGINT, inventory BIGINT,
                new_listings BIGINT, price_reduced BIGINT,
                fetched_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (location_id, date));",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn chunked_failure_leaves_no_later_period_stored() {
        let mut conn = db();
        cap_median_price(&conn);
        let jan = date(2024, 1, 31);
        let mut expensive = record(jan, "Hawaii", "HI");
        expensive.median_sale_price = Some(2_000_000.0);
        let feed = FakeFeed::serving(vec![
            record(date(2024, 2, 29), "Texas", "TX"),
            record(jan, "California", "CA"),
            expensive,
        ]);
        let opts = HousingSyncOptions {
            chunk_size: Some(1),
            ..HousingSyncOptions::default()
        };

        assert!(sync_housing(&mut conn, &feed, &opts).await.is_err());

        assert_eq!(housing_db::count(&conn).unwrap(), 1);
        assert_eq!(housing_db::max_date(&conn).unwrap(), Some(jan));
    }

    #[tokio::test]
    async fn unchunked_insert_failure_leaves_no_rows() {
        let mut conn = db();
        cap_median_price(&conn);
        let jan = date(2024, 1, 31);
        let mut expensive = record(jan, "Hawaii", "HI");
        expensive.median_sale_price = Some(2_000_000.0);
        let feed = FakeFeed::serving(vec![record(jan, "Texas", "TX"), expensive]);
        let opts = HousingSyncOptions {
            chunk_size: None,
            ..HousingSyncOptions::default()
        };

        assert!(!fetch_and_store_housing(&mut conn, &feed, &opts).await);
        assert_eq!(housing_db::count(&conn).unwrap(), 0);
        assert_eq!(locations::count(&conn).unwrap(), 2);
    }

    async fn seed_async(conn: &mut Connection, through: chrono::NaiveDate) {
        let feed = FakeFeed::serving(vec![record(through, "Ohio", "OH")]);
        let outcome = sync_housing(conn, &feed, &HousingSyncOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Imported(_)));
    }
}
