//! Yahoo Finance price provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API and keeps the adjusted close
//! as the price series. Yahoo has no official API and is subject to
//! unannounced format changes; every parse failure surfaces as
//! `ResponseFormatChanged`.

use super::http::HttpClient;
use super::provider::{DataError, DataSource, FetchResult, SeriesProvider};
use crate::domain::{Observation, TimeSeries};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    http: HttpClient,
}

impl YahooProvider {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn chart_url(symbol: &str) -> String {
        format!("https://query2.finance.yahoo.com/v8/finance/chart/{symbol}")
    }

    fn chart_query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        let start_ts = start.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp());
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map_or(start_ts, |t| t.and_utc().timestamp());
        vec![
            ("period1", start_ts.to_string()),
            ("period2", end_ts.to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ]
    }

    /// Parse the chart response into an adjusted-close series.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<TimeSeries, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SeriesNotFound {
                id: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::SeriesNotFound {
                id: symbol.to_string(),
            })?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("no adjusted close for {symbol}"))
            })?;

        let closes = data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let adj = adj_closes.get(i).copied().flatten();
            let close = closes.get(i).copied().flatten();

            // Non-trading rows carry neither price.
            if adj.is_none() && close.is_none() {
                continue;
            }
            points.push(match adj {
                Some(v) => Observation::new(date, v),
                None => Observation::gap(date),
            });
        }

        if points.is_empty() {
            return Err(DataError::SeriesNotFound {
                id: symbol.to_string(),
            });
        }

        Ok(TimeSeries::from_unordered(points))
    }
}

impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let query = Self::chart_query(start, end);
        let resp: ChartResponse = self.http.get_json(&Self::chart_url(symbol), &query, symbol)?;
        let series = Self::parse_response(symbol, resp)?;
        Ok(FetchResult {
            id: symbol.to_string(),
            series,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.http.breaker().is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<TimeSeries, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("SPY", resp)
    }

    #[test]
    fn adjusted_close_with_gaps() {
        // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
        let series = parse(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{
                    "quote":[{"close":[472.6,468.8,null]}],
                    "adjclose":[{"adjclose":[465.1,null,null]}]
                }}],"error":null}}"#,
        )
        .unwrap();
        // Third row has no price at all and is dropped; second is a gap.
        assert_eq!(series.len(), 2);
        assert_eq!(series.observed_values(), vec![465.1]);
        assert_eq!(
            series.first_date(),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[test]
    fn not_found_error() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SeriesNotFound { .. }));
    }

    #[test]
    fn missing_adjclose_is_format_change() {
        let err = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800],"indicators":{"quote":[{"close":[1.0]}]}}],"error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn query_covers_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let query = YahooProvider::chart_query(start, start);
        assert_eq!(query[0], ("period1", "1704067200".to_string()));
        assert_eq!(query[1], ("period2", "1704153599".to_string()));
    }
}
