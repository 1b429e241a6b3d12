use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use super::price::{PriceStore, StoreError};
use crate::model::{self, StockPriceRecord};

/// Opens (or creates) the sqlite file in WAL mode.
pub fn init_sqlite_connection(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    );
    match conn {
        Ok(conn) => match conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(())) {
            Ok(_) => Ok(conn),
            Err(e) => Err(format!("fail to execute PRAGMA journal_mode=WAL. {}", e)),
        },
        Err(e) => Err(format!("fail to open sqlite file {}. {}", path.display(), e)),
    }
}

/// Initializes the stock_prices table. The (symbol, timestamp) index is
/// deliberately not unique; duplicates are kept out by the ingestor.
pub fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stock_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            price REAL NOT NULL,
            timestamp TEXT NOT NULL
        );",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stock_prices_symbol_timestamp ON stock_prices (symbol, timestamp);",
        [],
    )?;
    Ok(())
}

/// [`PriceStore`] over a single sqlite connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Wraps `conn`, creating the table if needed.
    pub fn new(conn: Connection) -> rusqlite::Result<Self> {
        create_table(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = init_sqlite_connection(path)?;
        SqliteStore::new(conn).map_err(|e| format!("fail to create stock_prices table. {}", e))
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        SqliteStore::new(Connection::open_in_memory()?)
    }

    // Runs `f` on the blocking pool; rusqlite calls never run on a runtime worker.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl PriceStore for SqliteStore {
    async fn find_ids(
        &self,
        symbol: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        let symbol = symbol.to_string();
        let timestamp = model::canonical(timestamp);
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM stock_prices WHERE symbol = ?1 AND timestamp = ?2")?;
            let ids = stmt
                .query_map(params![symbol, timestamp], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn insert(&self, record: &StockPriceRecord) -> Result<(), StoreError> {
        let symbol = record.symbol.clone();
        let price = record.price;
        let timestamp = record.canonical_timestamp();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO stock_prices (symbol, price, timestamp) VALUES (?1, ?2, ?3)",
                params![symbol, price, timestamp],
            )?;
            Ok(())
        })
        .await
    }

    async fn history(
        &self,
        symbol: &str,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<StockPriceRecord>, StoreError> {
        let symbol = symbol.to_string();
        // Canonical timestamps sort lexically in time order.
        let since = since.map(model::canonical).unwrap_or_default();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT symbol, price, timestamp FROM stock_prices
                 WHERE symbol = ?1 AND timestamp >= ?2 ORDER BY timestamp ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![symbol, since])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let symbol: String = row.get(0)?;
                let price: f64 = row.get(1)?;
                let timestamp: String = row.get(2)?;
                let timestamp = model::parse_canonical(&timestamp)
                    .map_err(|e| StoreError::InvalidRow(format!("{}: {}", timestamp, e)))?;
                records.push(StockPriceRecord {
                    symbol,
                    price,
                    timestamp,
                });
            }
            Ok(records)
        })
        .await
    }
}
