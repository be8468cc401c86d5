//! Series catalog: which statistical series and tickers the dashboard loads.
//!
//! The catalog is a superset of what the health score consumes; the extra
//! series (job openings, debt service, consumer credit, federal debt) only
//! feed the summaries.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub units: &'static str,
    pub frequency: Frequency,
}

const fn spec(
    id: &'static str,
    label: &'static str,
    units: &'static str,
    frequency: Frequency,
) -> SeriesSpec {
    SeriesSpec {
        id,
        label,
        units,
        frequency,
    }
}

pub const FRED_SERIES: [SeriesSpec; 11] = [
    spec("UNRATE", "Unemployment Rate", "%", Frequency::Monthly),
    spec("PAYEMS", "Nonfarm Payrolls", "thousands", Frequency::Monthly),
    spec("ICSA", "Initial Jobless Claims", "claims", Frequency::Weekly),
    spec("JTSJOL", "Job Openings (JOLTS)", "thousands", Frequency::Monthly),
    spec("VIXCLS", "VIX (CBOE)", "index", Frequency::Daily),
    spec("CPIAUCSL", "CPI (All Urban Consumers)", "index", Frequency::Monthly),
    spec("FEDFUNDS", "Effective Fed Funds Rate", "%", Frequency::Monthly),
    spec("TDSP", "Household Debt Service Ratio", "%", Frequency::Quarterly),
    spec("DRCCLACBS", "Credit Card Delinquency Rate", "%", Frequency::Quarterly),
    spec("TOTALSL", "Total Consumer Credit", "USD (billions)", Frequency::Monthly),
    spec("GFDEBTN", "Federal Debt: Total Public Debt", "USD (millions)", Frequency::Daily),
];

/// Ticker → display label.
pub const TICKERS: [(&str, &str); 3] = [
    ("GLD", "Gold (GLD)"),
    ("SPY", "S&P 500 (SPY)"),
    ("VTI", "Total Market (VTI)"),
];

/// Labor-market series, in display order.
pub const JOB_SERIES: [&str; 4] = ["UNRATE", "PAYEMS", "ICSA", "JTSJOL"];

pub fn series_spec(id: &str) -> Option<&'static SeriesSpec> {
    FRED_SERIES.iter().find(|s| s.id == id)
}

pub fn fred_ids() -> Vec<&'static str> {
    FRED_SERIES.iter().map(|s| s.id).collect()
}

pub fn ticker_label(symbol: &str) -> Option<&'static str> {
    TICKERS.iter().find(|(t, _)| *t == symbol).map(|(_, l)| *l)
}
