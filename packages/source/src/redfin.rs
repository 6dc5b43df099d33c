//! Redfin state-level market tracker bulk feed.
//!
//! The feed is a single gzip-compressed, tab-separated snapshot containing
//! every historical period for every state. Each download is decoded into
//! typed [`StateMarketRecord`]s; rows are validated here so the ingestion
//! driver never sees raw strings.

use std::io::Read as _;

use async_trait::async_trait;
use housing_market_source_models::StateMarketRecord;
use serde::Deserialize;

use crate::parsing::{parse_optional_count, parse_optional_f64, require_date};
use crate::{HousingFeed, SourceError};

/// Public location of the state market tracker snapshot.
pub const DEFAULT_URL: &str = "https://redfin-public-data.s3.us-west-2.amazonaws.com/redfin_market_tracker/state_market_tracker.tsv000.gz";

/// Environment variable that overrides [`DEFAULT_URL`].
pub const URL_ENV_VAR: &str = "REDFIN_STATE_TRACKER_URL";

const USER_AGENT: &str = concat!("housing_market_ingest/", env!("CARGO_PKG_VERSION"));

/// Leading bytes of every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A row exactly as it appears in the TSV, before validation.
#[derive(Debug, Deserialize)]
struct RawStateMarketRow {
    #[serde(rename = "PERIOD_END")]
    period_end: String,
    #[serde(rename = "STATE")]
    state: String,
    #[serde(rename = "STATE_CODE")]
    state_code: String,
    #[serde(rename = "PROPERTY_TYPE", default)]
    property_type: Option<String>,
    #[serde(rename = "MEDIAN_SALE_PRICE")]
    median_sale_price: String,
    #[serde(rename = "MEDIAN_PPSF")]
    median_ppsf: String,
    #[serde(rename = "MEDIAN_DOM")]
    median_dom: String,
    #[serde(rename = "INVENTORY")]
    inventory: String,
    #[serde(rename = "NEW_LISTINGS")]
    new_listings: String,
    #[serde(rename = "PRICE_DROPS")]
    price_drops: String,
}

impl TryFrom<RawStateMarketRow> for StateMarketRecord {
    type Error = SourceError;

    fn try_from(raw: RawStateMarketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            period_end: require_date("PERIOD_END", &raw.period_end)?,
            state: raw.state.trim().to_string(),
            state_code: raw.state_code.trim().to_uppercase(),
            property_type: raw
                .property_type
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            median_sale_price: parse_optional_f64("MEDIAN_SALE_PRICE", &raw.median_sale_price)?,
            median_ppsf: parse_optional_f64("MEDIAN_PPSF", &raw.median_ppsf)?,
            median_dom: parse_optional_count("MEDIAN_DOM", &raw.median_dom)?,
            inventory: parse_optional_count("INVENTORY", &raw.inventory)?,
            new_listings: parse_optional_count("NEW_LISTINGS", &raw.new_listings)?,
            price_drops: parse_optional_count("PRICE_DROPS", &raw.price_drops)?,
        })
    }
}

/// Decodes a snapshot body into typed records.
///
/// The body is decompressed first if it starts with the gzip magic bytes,
/// so both the published `.gz` file and an already-inflated TSV are
/// accepted.
///
/// # Errors
///
/// Returns [`SourceError`] if decompression fails, a required column is
/// missing, or any row holds an invalid date or non-numeric value.
pub fn decode_snapshot(body: &[u8]) -> Result<Vec<StateMarketRecord>, SourceError> {
    let tsv: Vec<u8> = if body.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(body);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        log::debug!("Decompressed snapshot to {} bytes", decompressed.len());
        decompressed
    } else {
        body.to_vec()
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(tsv.as_slice());

    let mut records = Vec::new();
    for row in reader.deserialize::<RawStateMarketRow>() {
        records.push(StateMarketRecord::try_from(row?)?);
    }

    Ok(records)
}

/// Client for the Redfin state market tracker snapshot.
#[derive(Debug, Clone)]
pub struct RedfinStateTracker {
    url: String,
    client: reqwest::Client,
}

impl RedfinStateTracker {
    /// Creates a tracker client that downloads from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            url: url.to_owned(),
            client,
        })
    }

    /// Creates a tracker client for [`URL_ENV_VAR`], or [`DEFAULT_URL`] when
    /// the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, SourceError> {
        let url = std::env::var(URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(&url)
    }

    /// The snapshot URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HousingFeed for RedfinStateTracker {
    fn name(&self) -> &str {
        "Redfin state market tracker"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<StateMarketRecord>, SourceError> {
        log::info!("Downloading snapshot: {}", self.url);

        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        log::debug!("Downloaded {} bytes from {}", bytes.len(), self.url);

        let records = decode_snapshot(&bytes)?;

        log::info!("Parsed {} records from {}", records.len(), self.url);

        Ok(records)
    }
}
