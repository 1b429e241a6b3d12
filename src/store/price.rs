use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::client::RequestError;
use crate::model::StockPriceRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Store request failed: {0}")]
    Request(#[from] RequestError),
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
    #[error("Store connection lock poisoned")]
    Poisoned,
    #[error("Store task failed: {0}")]
    Task(String),
}

/// Time series table of stock prices.
///
/// Implementations do not enforce uniqueness of `(symbol, timestamp)`;
/// callers check with [`PriceStore::find_ids`] before inserting.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Ids of rows matching `symbol` and `timestamp` exactly.
    async fn find_ids(&self, symbol: &str, timestamp: &DateTime<Utc>)
    -> Result<Vec<i64>, StoreError>;

    /// Inserts one row.
    async fn insert(&self, record: &StockPriceRecord) -> Result<(), StoreError>;

    /// Rows of `symbol`, oldest first, optionally starting at `since`.
    async fn history(
        &self,
        symbol: &str,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<StockPriceRecord>, StoreError>;
}
