//! FRED (Federal Reserve Economic Data) provider.
//!
//! Uses the `series/observations` endpoint. FRED encodes a missing
//! observation as the string `"."`; those become gaps.

use super::http::HttpClient;
use super::provider::{DataError, DataSource, FetchResult, SeriesProvider};
use crate::domain::{Observation, TimeSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

pub const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

pub struct FredProvider {
    http: HttpClient,
    api_key: Option<String>,
}

impl FredProvider {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn parse_response(id: &str, resp: ObservationsResponse) -> Result<TimeSeries, DataError> {
        let mut points = Vec::with_capacity(resp.observations.len());
        for raw in resp.observations {
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").map_err(|e| {
                DataError::ResponseFormatChanged(format!("bad date '{}' in {id}: {e}", raw.date))
            })?;
            match raw.value.trim().parse::<f64>() {
                Ok(v) => points.push(Observation::new(date, v)),
                Err(_) => {
                    if raw.value != "." {
                        debug!(id, value = %raw.value, "unparseable FRED value treated as gap");
                    }
                    points.push(Observation::gap(date));
                }
            }
        }

        if points.is_empty() {
            return Err(DataError::SeriesNotFound { id: id.to_string() });
        }
        Ok(TimeSeries::from_unordered(points))
    }
}

impl SeriesProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(&self, id: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            DataError::AuthenticationRequired("FRED requires an API key".into())
        })?;

        let query = [
            ("series_id", id.to_string()),
            ("api_key", api_key.clone()),
            ("file_type", "json".to_string()),
            ("observation_start", start.format("%Y-%m-%d").to_string()),
            ("observation_end", end.format("%Y-%m-%d").to_string()),
        ];
        let resp: ObservationsResponse = self.http.get_json(FRED_OBSERVATIONS_URL, &query, id)?;
        let series = Self::parse_response(id, resp)?;

        Ok(FetchResult {
            id: id.to_string(),
            series,
            source: DataSource::Fred,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.http.breaker().is_allowed()
    }
}
