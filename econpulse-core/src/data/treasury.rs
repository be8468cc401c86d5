//! Treasury Fiscal Data "Debt to the Penny".

use super::http::HttpClient;
use super::provider::DataError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEBT_TO_PENNY_URL: &str =
    "https://api.fiscaldata.treasury.gov/services/api/fiscal_service/v2/accounting/od/debt_to_penny";

#[derive(Debug, Deserialize)]
struct DebtResponse {
    data: Vec<DebtRow>,
}

#[derive(Debug, Deserialize)]
struct DebtRow {
    record_date: String,
    total_public_debt_outstanding: String,
}

/// Latest total public debt outstanding, in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub record_date: NaiveDate,
    pub total_public_debt: f64,
}

pub struct TreasuryClient {
    http: HttpClient,
}

impl TreasuryClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn debt_to_the_penny(&self) -> Result<DebtRecord, DataError> {
        let query = [
            ("sort", "-record_date".to_string()),
            ("page[size]", "1".to_string()),
            ("fields", "record_date,total_public_debt_outstanding".to_string()),
        ];
        let resp: DebtResponse = self.http.get_json(DEBT_TO_PENNY_URL, &query, "debt_to_penny")?;
        parse_latest(resp)
    }
}

fn parse_latest(resp: DebtResponse) -> Result<DebtRecord, DataError> {
    let row = resp
        .data
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("debt_to_penny returned no rows".into()))?;

    let record_date = NaiveDate::parse_from_str(&row.record_date, "%Y-%m-%d")
        .map_err(|e| DataError::ResponseFormatChanged(format!("record_date: {e}")))?;
    let total_public_debt = row
        .total_public_debt_outstanding
        .parse::<f64>()
        .map_err(|e| DataError::ResponseFormatChanged(format!("total_public_debt_outstanding: {e}")))?;

    Ok(DebtRecord {
        record_date,
        total_public_debt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_row() {
        let resp: DebtResponse = serde_json::from_str(
            r#"{"data":[{"record_date":"2024-06-28","total_public_debt_outstanding":"34831634994576.83"}],
                "meta":{"count":1}}"#,
        )
        .unwrap();
        let record = parse_latest(resp).unwrap();
        assert_eq!(record.record_date, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
        assert!((record.total_public_debt / 1e12 - 34.83).abs() < 0.01);
    }

    #[test]
    fn empty_data_is_format_change() {
        let resp: DebtResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(
            parse_latest(resp),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }
}
