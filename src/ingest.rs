use std::sync::Arc;

use thiserror::Error;

use crate::constants;
use crate::http::client::RequestError;
use crate::marketdata::api_caller::QuoteSource;
use crate::marketdata::response::{DecodeError, IntradayBatch};
use crate::model::StockPriceRecord;
use crate::store::price::{PriceStore, StoreError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Error fetching quotes: {0}")]
    Fetch(#[from] RequestError),
    #[error("Invalid data from provider: {0}")]
    MissingTimeSeries(DecodeError),
    #[error("Error decoding quotes: {0}")]
    Decode(DecodeError),
    #[error("Error inserting data for {timestamp}: {source}")]
    Insert {
        timestamp: String,
        source: StoreError,
    },
}

impl From<DecodeError> for IngestError {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::MissingTimeSeries { .. } => IngestError::MissingTimeSeries(value),
            other => IngestError::Decode(other),
        }
    }
}

/// What one ingestion did. Logged, not reported to the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub lookup_failures: usize,
}

/// Pulls one batch of quotes for a symbol and stores the ones not yet stored.
///
/// The existence check and the insert are separate store calls, so two
/// concurrent runs for the same symbol can both insert the same row.
#[derive(Clone)]
pub struct Ingestor {
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn PriceStore>,
    interval: &'static str,
}

impl Ingestor {
    pub fn new(source: Arc<dyn QuoteSource>, store: Arc<dyn PriceStore>) -> Self {
        Ingestor {
            source,
            store,
            interval: constants::INTERVAL,
        }
    }

    /// Fetches the intraday batch for `symbol` and inserts every observation
    /// the store does not hold yet, in provider order.
    ///
    /// A failed existence check skips that observation. A failed insert
    /// aborts the batch; rows inserted before it stay.
    pub async fn ingest(&self, symbol: &str) -> Result<IngestSummary, IngestError> {
        let payload = self.source.intraday(symbol, self.interval).await?;
        let batch = match IntradayBatch::decode(payload, self.interval) {
            Ok(batch) => batch,
            Err(err) => {
                if let DecodeError::MissingTimeSeries {
                    notice: Some(notice),
                    ..
                } = &err
                {
                    log::error!("Invalid data from provider for {}: {}", symbol, notice);
                }
                return Err(err.into());
            }
        };

        if let Some(zone) = &batch.time_zone {
            log::debug!("{}: provider announced time zone {}, storing timestamps as UTC", symbol, zone);
        }

        let mut summary = IngestSummary {
            fetched: batch.len(),
            ..Default::default()
        };

        for observation in &batch.observations {
            let price = observation.price()?;
            let timestamp = observation.instant()?;
            let record = StockPriceRecord {
                symbol: symbol.to_string(),
                price,
                timestamp,
            };
            let canonical = record.canonical_timestamp();

            let existing = match self.store.find_ids(symbol, &record.timestamp).await {
                Ok(ids) => ids,
                Err(err) => {
                    log::error!("Error checking existing data for {} at {}: {}", symbol, canonical, err);
                    summary.lookup_failures += 1;
                    continue;
                }
            };

            if !existing.is_empty() {
                log::debug!("{} at {} already stored", symbol, canonical);
                summary.already_present += 1;
                continue;
            }

            if let Err(source) = self.store.insert(&record).await {
                return Err(IngestError::Insert {
                    timestamp: canonical,
                    source,
                });
            }
            summary.inserted += 1;
        }

        log::info!(
            "{}: fetched {}, inserted {}, already present {}, lookup failures {}",
            symbol,
            summary.fetched,
            summary.inserted,
            summary.already_present,
            summary.lookup_failures
        );
        Ok(summary)
    }
}
