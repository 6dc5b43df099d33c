//! FRED (Federal Reserve Economic Data) series observations client.
//!
//! Each request pulls one series over a date window from the
//! `series/observations` endpoint. FRED reports a missing observation as the
//! literal value `"."`; those are dropped rather than stored as empty rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use housing_market_models::MortgageSeries;
use housing_market_source_models::SeriesObservation;
use serde::Deserialize;

use crate::parsing::{parse_optional_f64, require_date};
use crate::{SeriesProvider, SourceError};

/// Base URL of the FRED observations endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Environment variable holding the FRED API key.
pub const API_KEY_ENV_VAR: &str = "FRED_API_KEY";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV_VAR: &str = "FRED_BASE_URL";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

/// Parses an observations response body for `series`.
///
/// # Errors
///
/// Returns [`SourceError`] if the body is not the expected JSON shape or an
/// observation carries an invalid date or non-numeric value.
pub fn parse_observations(
    series: MortgageSeries,
    body: &str,
) -> Result<Vec<SeriesObservation>, SourceError> {
    let response: ObservationsResponse = serde_json::from_str(body)?;

    let mut observations = Vec::with_capacity(response.observations.len());
    for raw in response.observations {
        let date = require_date("date", &raw.date)?;
        let Some(value) = parse_optional_f64(series.series_id(), &raw.value)? else {
            log::debug!("{}: no value for {date}, skipping", series.series_id());
            continue;
        };
        observations.push(SeriesObservation {
            series,
            date,
            value,
        });
    }

    Ok(observations)
}

/// Client for the FRED observations API.
#[derive(Debug, Clone)]
pub struct FredClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl FredClient {
    /// Creates a client authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingCredential`] if `api_key` is blank, or
    /// [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str) -> Result<Self, SourceError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SourceError::MissingCredential {
                var: API_KEY_ENV_VAR,
            });
        }

        Ok(Self {
            api_key: api_key.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Creates a client from the [`API_KEY_ENV_VAR`] environment variable,
    /// pointed at [`BASE_URL_ENV_VAR`] when that is set.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingCredential`] if the key is unset or
    /// blank.
    pub fn from_env() -> Result<Self, SourceError> {
        let api_key = std::env::var(API_KEY_ENV_VAR).map_err(|_| SourceError::MissingCredential {
            var: API_KEY_ENV_VAR,
        })?;
        let client = Self::new(&api_key)?;

        match std::env::var(BASE_URL_ENV_VAR) {
            Ok(base_url) if !base_url.trim().is_empty() => {
                log::info!("Using FRED endpoint {base_url}");
                Ok(client.with_base_url(base_url.trim()))
            }
            _ => Ok(client),
        }
    }

    /// Points the client at a different observations endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }
}

#[async_trait]
impl SeriesProvider for FredClient {
    fn name(&self) -> &str {
        "FRED"
    }

    async fn observations(
        &self,
        series: MortgageSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesObservation>, SourceError> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();

        log::info!(
            "Requesting {} ({}) from {start} to {end}",
            series.series_id(),
            series.description()
        );

        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", series.series_id()),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let observations = parse_observations(series, &body)?;

        log::info!(
            "{}: {} observations",
            series.series_id(),
            observations.len()
        );

        Ok(observations)
    }
}
