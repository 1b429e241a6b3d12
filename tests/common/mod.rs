#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::Barrier;

use stock_ingest::http::client::RequestError;
use stock_ingest::ingest::Ingestor;
use stock_ingest::marketdata::api_caller::QuoteSource;
use stock_ingest::model::{self, StockPriceRecord};
use stock_ingest::store::price::{PriceStore, StoreError};

/// Returns the same document on every call and counts calls.
pub struct ScriptedSource {
    payload: Value,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(ScriptedSource {
            payload,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    async fn intraday(&self, _symbol: &str, _interval: &str) -> Result<Value, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Fails every call.
pub struct UnreachableSource;

#[async_trait]
impl QuoteSource for UnreachableSource {
    async fn intraday(&self, _symbol: &str, _interval: &str) -> Result<Value, RequestError> {
        Err(RequestError::Transport("connection refused".into()))
    }
}

/// In-memory table with injectable faults.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StockPriceRecord>>,
    // Canonical timestamps whose existence check fails.
    pub failing_lookups: Mutex<HashSet<String>>,
    // 1-based index of the insert call that fails.
    pub failing_insert: Mutex<Option<usize>>,
    pub lookups: AtomicUsize,
    pub insert_calls: AtomicUsize,
    // When set, every lookup waits here after reading.
    pub lookup_barrier: Option<Arc<Barrier>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStore::default())
    }

    pub fn with_lookup_barrier(barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(MemoryStore {
            lookup_barrier: Some(barrier),
            ..MemoryStore::default()
        })
    }

    pub fn fail_lookup_at(&self, canonical: &str) {
        self.failing_lookups.lock().unwrap().insert(canonical.into());
    }

    pub fn fail_insert_number(&self, n: usize) {
        *self.failing_insert.lock().unwrap() = Some(n);
    }

    pub fn rows(&self) -> Vec<StockPriceRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn count(&self, symbol: &str, canonical: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.symbol == symbol && r.canonical_timestamp() == canonical)
            .count()
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn find_ids(
        &self,
        symbol: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let canonical = model::canonical(timestamp);
        if self.failing_lookups.lock().unwrap().contains(&canonical) {
            return Err(StoreError::InvalidRow(format!("lookup failed at {}", canonical)));
        }
        let ids: Vec<i64> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.symbol == symbol && r.timestamp == *timestamp)
            .map(|(i, _)| i as i64 + 1)
            .collect();
        if let Some(barrier) = &self.lookup_barrier {
            barrier.wait().await;
        }
        Ok(ids)
    }

    async fn insert(&self, record: &StockPriceRecord) -> Result<(), StoreError> {
        let n = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.failing_insert.lock().unwrap() == Some(n) {
            return Err(StoreError::InvalidRow("insert rejected".into()));
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn history(
        &self,
        symbol: &str,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<StockPriceRecord>, StoreError> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.symbol == symbol && since.map_or(true, |s| r.timestamp >= *s))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }
}

pub fn ingestor(source: Arc<dyn QuoteSource>, store: Arc<dyn PriceStore>) -> Ingestor {
    Ingestor::new(source, store)
}

/// Provider document with the given (timestamp, close) bars, in order.
pub fn intraday(bars: &[(&str, &str)]) -> Value {
    let mut series = serde_json::Map::new();
    for (ts, close) in bars {
        series.insert(
            ts.to_string(),
            json!({
                "1. open": close,
                "2. high": close,
                "3. low": close,
                "4. close": close,
                "5. volume": "100"
            }),
        );
    }
    json!({
        "Meta Data": {
            "1. Information": "Intraday (60min) open, high, low, close prices and volume",
            "2. Symbol": "ABC",
            "4. Interval": "60min"
        },
        "Time Series (60min)": series
    })
}

pub fn example_batch() -> Value {
    json!({
        "Time Series (60min)": {
            "2024-01-01 09:00:00": {"4. close": "10.50"},
            "2024-01-01 10:00:00": {"4. close": "10.75"}
        }
    })
}
