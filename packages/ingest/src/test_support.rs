//! In-process fakes for the upstream traits.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use housing_market_models::MortgageSeries;
use housing_market_source::{HousingFeed, SeriesProvider, SourceError};
use housing_market_source_models::{SeriesObservation, StateMarketRecord};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(period_end: NaiveDate, state: &str, state_code: &str) -> StateMarketRecord {
    StateMarketRecord {
        period_end,
        state: state.to_string(),
        state_code: state_code.to_string(),
        property_type: Some("All Residential".to_string()),
        median_sale_price: Some(500_000.0),
        median_ppsf: Some(250.0),
        median_dom: Some(30),
        inventory: Some(1_000),
        new_listings: Some(200),
        price_drops: Some(50),
    }
}

/// Replays queued snapshot results, one per download.
pub struct FakeFeed {
    responses: Mutex<VecDeque<Result<Vec<StateMarketRecord>, String>>>,
    calls: AtomicUsize,
}

impl FakeFeed {
    pub fn new(responses: Vec<Result<Vec<StateMarketRecord>, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn serving(snapshot: Vec<StateMarketRecord>) -> Self {
        Self::new(vec![Ok(snapshot)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HousingFeed for FakeFeed {
    fn name(&self) -> &str {
        "fake feed"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<StateMarketRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(message)) => Err(SourceError::Parse { message }),
            None => Err(SourceError::Parse {
                message: "no more queued snapshots".to_string(),
            }),
        }
    }
}

/// Serves fixed observations per series; series mapped to `Err` fail.
pub struct FakeProvider {
    series: BTreeMap<MortgageSeries, Result<Vec<(NaiveDate, f64)>, String>>,
    pub requests: Mutex<Vec<(MortgageSeries, NaiveDate, NaiveDate)>>,
}

impl FakeProvider {
    pub fn new(series: BTreeMap<MortgageSeries, Result<Vec<(NaiveDate, f64)>, String>>) -> Self {
        Self {
            series,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SeriesProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake provider"
    }

    async fn observations(
        &self,
        series: MortgageSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesObservation>, SourceError> {
        self.requests.lock().unwrap().push((series, start, end));
        match self.series.get(&series) {
            Some(Ok(values)) => Ok(values
                .iter()
                .map(|&(date, value)| SeriesObservation {
                    series,
                    date,
                    value,
                })
                .collect()),
            Some(Err(message)) => Err(SourceError::Parse {
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}
