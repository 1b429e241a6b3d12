use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

/// Body of an ingestion request.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub symbol: Option<String>,
}

/// A persisted price point.
#[derive(Debug, Clone, PartialEq)]
pub struct StockPriceRecord {
    pub symbol: String,           // Caller supplied symbol, not validated.
    pub price: f64,               // Closing price of the interval.
    pub timestamp: DateTime<Utc>, // Start of the interval.
}

impl StockPriceRecord {
    /// Timestamp in the form it is stored and compared in.
    pub fn canonical_timestamp(&self) -> String {
        canonical(&self.timestamp)
    }
}

/// Renders an instant as RFC 3339 UTC with millisecond precision,
/// e.g. `2024-01-01T09:00:00.000Z`.
pub fn canonical(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored timestamp back into an instant. Accepts any RFC 3339
/// offset, since some stores render `+00:00` instead of `Z`.
pub fn parse_canonical(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}
