use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants;

const META_DATA: &str = "Meta Data";
const META_TIME_ZONE: &str = "6. Time Zone";
// Keys the provider uses instead of a series when it refuses a call.
const NOTICE_KEYS: [&str; 3] = ["Note", "Information", "Error Message"];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Response has no '{key}' field")]
    MissingTimeSeries { key: String, notice: Option<String> },
    #[error("Response is not a JSON object")]
    NotAnObject,
    #[error("Malformed entry at {timestamp}: {reason}")]
    MalformedEntry { timestamp: String, reason: String },
    #[error("Invalid close price '{value}' at {timestamp}")]
    InvalidPrice { timestamp: String, value: String },
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// One observation as received: provider-local timestamp and close price text.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub timestamp: String,
    pub close: String,
}

impl PriceObservation {
    /// Numeric close price.
    pub fn price(&self) -> Result<f64, DecodeError> {
        self.close
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::InvalidPrice {
                timestamp: self.timestamp.clone(),
                value: self.close.clone(),
            })
    }

    /// Absolute instant of the observation. Timestamps without an offset
    /// are read as UTC, whatever zone the provider announces, so one bar
    /// always maps to one stored key.
    pub fn instant(&self) -> Result<DateTime<Utc>, DecodeError> {
        let raw = self.timestamp.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            })
            .map_err(|_| DecodeError::InvalidTimestamp(self.timestamp.clone()))?;
        Ok(Utc.from_utc_datetime(&naive))
    }
}

/// The decoded provider response for one symbol.
#[derive(Debug)]
pub struct IntradayBatch {
    pub time_zone: Option<String>, // As announced; informational only.
    pub observations: Vec<PriceObservation>, // In provider order.
}

/// Key of the series field for an interval, e.g. "Time Series (60min)".
pub fn series_key(interval: &str) -> String {
    format!("Time Series ({})", interval)
}

impl IntradayBatch {
    /// Decodes an intraday response. A response without the series field is
    /// rejected as a whole, whatever else it carries.
    pub fn decode(value: Value, interval: &str) -> Result<Self, DecodeError> {
        let Value::Object(mut doc) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let key = series_key(interval);
        let series = match doc.remove(&key) {
            Some(Value::Object(series)) => series,
            _ => {
                return Err(DecodeError::MissingTimeSeries {
                    key,
                    notice: notice(&doc),
                });
            }
        };

        let time_zone = doc
            .get(META_DATA)
            .and_then(|meta| meta.get(META_TIME_ZONE))
            .and_then(Value::as_str)
            .map(String::from);

        let mut observations = Vec::with_capacity(series.len());
        for (timestamp, fields) in series {
            let close = match fields.get(constants::CLOSE_FIELD) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(DecodeError::MalformedEntry {
                        timestamp,
                        reason: format!("no '{}' field", constants::CLOSE_FIELD),
                    });
                }
            };
            observations.push(PriceObservation { timestamp, close });
        }

        Ok(IntradayBatch {
            time_zone,
            observations,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn notice(doc: &Map<String, Value>) -> Option<String> {
    NOTICE_KEYS
        .iter()
        .find_map(|k| doc.get(*k).and_then(Value::as_str))
        .map(String::from)
}
