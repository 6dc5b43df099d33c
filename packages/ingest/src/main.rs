#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the housing market ingestion tool.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use housing_market_database::{db, report};
use housing_market_database_models::DatabaseSummary;
use housing_market_ingest::{fetch_and_store_housing, fetch_and_store_mortgage_rates};
use housing_market_ingest_models::{
    DEFAULT_CHUNK_SIZE, DEFAULT_DAYS_BACK, DEFAULT_PROPERTY_TYPE, HousingSyncOptions,
};
use housing_market_models::FreshnessPolicy;
use housing_market_source::fred::FredClient;
use housing_market_source::redfin::RedfinStateTracker;

#[derive(Parser)]
#[command(name = "housing_market_ingest", about = "Housing market data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync state-level housing market data from the Redfin market tracker
    Housing {
        /// Comma-separated list of state codes to keep (e.g., "CA,TX").
        /// If not specified, every state is ingested.
        #[arg(long, value_delimiter = ',')]
        states: Vec<String>,
        /// Only ingest rows of this property type. Pass an empty string to
        /// keep every type.
        #[arg(long, default_value = DEFAULT_PROPERTY_TYPE)]
        property_type: String,
        /// Rows per committed transaction. 0 stages everything in one.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// What to do when the freshness check fails: `fail-open` or
        /// `fail-closed`
        #[arg(long, default_value_t = FreshnessPolicy::FailOpen)]
        freshness_policy: FreshnessPolicy,
    },
    /// Sync national mortgage rates from FRED (requires `FRED_API_KEY`)
    Mortgage {
        /// Number of days of history to request
        #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
        days_back: u32,
    },
    /// Create the database file and schema
    InitDb,
    /// Check that the database can be opened and queried
    CheckConnection,
    /// Print a summary of the ingested data
    Verify {
        /// State whose latest housing rows to show
        #[arg(long, default_value = "CA")]
        state: String,
        /// Number of latest rows to show
        #[arg(long, default_value = "5")]
        limit: u32,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Housing {
            states,
            property_type,
            chunk_size,
            freshness_policy,
        } => {
            let feed = RedfinStateTracker::from_env()?;
            log::info!("Housing feed: {}", feed.url());
            let opts = HousingSyncOptions {
                freshness_policy,
                property_type: (!property_type.trim().is_empty()).then_some(property_type),
                chunk_size: (chunk_size > 0).then_some(chunk_size),
                ..HousingSyncOptions::default()
            }
            .with_states(states);

            let mut conn = db::connect_from_env()?;
            if fetch_and_store_housing(&mut conn, &feed, &opts).await {
                println!("Successfully fetched and stored Redfin data");
            } else {
                println!("Failed to fetch and store Redfin data");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Mortgage { days_back } => {
            let provider = FredClient::from_env()?;
            let today = chrono::Utc::now().date_naive();

            let mut conn = db::connect_from_env()?;
            if fetch_and_store_mortgage_rates(&mut conn, &provider, days_back, today).await {
                println!("Successfully fetched and stored FRED data");
            } else {
                println!("Failed to fetch and store FRED data");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::InitDb => {
            log::info!("Creating database schema...");
            let path = db::database_path_from_env();
            housing_market_database::open(&path)?;
            println!("Database initialized at {}", path.display());
        }
        Commands::CheckConnection => {
            let path = db::database_path_from_env();
            match housing_market_database::open(&path).and_then(|conn| db::ping(&conn)) {
                Ok(()) => println!("Database connection OK: {}", path.display()),
                Err(e) => {
                    println!("Database connection failed: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Verify { state, limit } => {
            let conn = db::connect_from_env()?;
            let summary = report::summarize(&conn)?;
            print_summary(&summary);

            println!();
            println!("Latest {limit} housing rows for {state}:");
            println!(
                "{:<12} {:>14} {:>10} {:>6} {:>10} {:>10} {:>10}",
                "DATE", "MEDIAN PRICE", "PPSF", "DOM", "INVENTORY", "NEW", "REDUCED"
            );
            for row in report::latest_housing_for_state(&conn, &state, limit)? {
                println!(
                    "{:<12} {:>14} {:>10} {:>6} {:>10} {:>10} {:>10}",
                    row.date.to_string(),
                    fmt_opt(row.median_price.map(|v| format!("{v:.0}"))),
                    fmt_opt(row.median_price_sqft.map(|v| format!("{v:.2}"))),
                    fmt_opt(row.median_dom),
                    fmt_opt(row.inventory),
                    fmt_opt(row.new_listings),
                    fmt_opt(row.price_reduced),
                );
            }

            println!();
            println!("Latest {limit} national mortgage rows:");
            println!(
                "{:<12} {:<14} {:>8} {:>8} {:>8}",
                "DATE", "SERIES", "30YR", "15YR", "5/1 ARM"
            );
            for row in report::latest_national_mortgage(&conn, limit)? {
                println!(
                    "{:<12} {:<14} {:>8} {:>8} {:>8}",
                    row.date.to_string(),
                    row.series.series_id(),
                    fmt_opt(row.rate_30yr_fixed),
                    fmt_opt(row.rate_15yr_fixed),
                    fmt_opt(row.rate_5yr_arm),
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &DatabaseSummary) {
    println!("Locations: {}", summary.location_count);
    for location in &summary.sample_locations {
        println!(
            "  {:<6} {:<8} {}",
            location.id,
            location.location_type.to_string(),
            location.name
        );
    }

    println!("Housing rows: {}", summary.housing_count);
    if let Some(range) = summary.housing_dates {
        println!("  Dates: {} to {}", range.start, range.end);
    }
    let nulls = summary.housing_nulls;
    println!("  NULL median_price:      {}", nulls.median_price);
    println!("  NULL median_price_sqft: {}", nulls.median_price_sqft);
    println!("  NULL median_dom:        {}", nulls.median_dom);
    println!("  NULL inventory:         {}", nulls.inventory);
    println!("  NULL new_listings:      {}", nulls.new_listings);
    println!("  NULL price_reduced:     {}", nulls.price_reduced);

    println!("Mortgage rows: {}", summary.mortgage_count);
    if let Some(range) = summary.mortgage_dates {
        println!("  Dates: {} to {}", range.start, range.end);
    }
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
