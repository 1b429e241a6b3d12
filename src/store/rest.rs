use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use super::price::{PriceStore, StoreError};
use crate::constants;
use crate::http::client::{self, RequestError};
use crate::model::{self, StockPriceRecord};

// Row shape accepted by the insert endpoint.
#[derive(Serialize)]
struct InsertRow<'a> {
    symbol: &'a str,
    price: f64,
    timestamp: String,
}

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

#[derive(Deserialize)]
struct PriceRow {
    symbol: String,
    price: f64,
    timestamp: String,
}

/// [`PriceStore`] backed by a PostgREST endpoint, such as a Supabase project.
pub struct RestStore {
    table_url: String,
    key: String,
}

impl RestStore {
    pub fn new(project_url: &Url, key: impl Into<String>) -> Result<Self, StoreError> {
        let table_url = table_url(project_url)?;
        Ok(RestStore {
            table_url,
            key: key.into(),
        })
    }

    fn headers(&self) -> HashMap<&str, &str> {
        HashMap::from([("apikey", self.key.as_str())])
    }
}

// `<project>/rest/v1/stock_prices`, keeping any path prefix of the project url.
fn table_url(project_url: &Url) -> Result<String, StoreError> {
    let mut url = project_url.clone();
    url.path_segments_mut()
        .map_err(|_| RequestError::Other(format!("{} cannot be a base url", project_url)))?
        .pop_if_empty()
        .extend(["rest", "v1", constants::PRICES_TABLE]);
    Ok(url.to_string())
}

// PostgREST equality filter value.
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl PriceStore for RestStore {
    async fn find_ids(
        &self,
        symbol: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        let symbol = eq(symbol);
        let timestamp = eq(&model::canonical(timestamp));
        let rows = client::request::<Vec<IdRow>>(
            client::Method::Get,
            &self.table_url,
            HashMap::from([
                ("select", "id"),
                ("symbol", symbol.as_str()),
                ("timestamp", timestamp.as_str()),
            ]),
            self.headers(),
            Some(&self.key),
        )
        .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn insert(&self, record: &StockPriceRecord) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&[InsertRow {
            symbol: &record.symbol,
            price: record.price,
            timestamp: record.canonical_timestamp(),
        }])
        .map_err(|e| RequestError::JsonError(e.to_string()))?;

        let mut headers = self.headers();
        headers.insert("Content-Type", "application/json");
        headers.insert("Prefer", "return=minimal");

        client::send(
            client::Method::Post(Some(body)),
            &self.table_url,
            HashMap::new(),
            headers,
            Some(&self.key),
        )
        .await?;
        Ok(())
    }

    async fn history(
        &self,
        symbol: &str,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<StockPriceRecord>, StoreError> {
        let symbol = eq(symbol);
        let since = since.map(|ts| format!("gte.{}", model::canonical(ts)));
        let mut params = HashMap::from([
            ("select", "symbol,price,timestamp"),
            ("symbol", symbol.as_str()),
            ("order", "timestamp.asc"),
        ]);
        if let Some(since) = since.as_deref() {
            params.insert("timestamp", since);
        }

        let rows = client::request::<Vec<PriceRow>>(
            client::Method::Get,
            &self.table_url,
            params,
            self.headers(),
            Some(&self.key),
        )
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StockPriceRecord, StoreError> {
                let timestamp = model::parse_canonical(&row.timestamp)
                    .map_err(|e| StoreError::InvalidRow(format!("{}: {}", row.timestamp, e)))?;
                Ok(StockPriceRecord {
                    symbol: row.symbol,
                    price: row.price,
                    timestamp,
                })
            })
            .collect()
    }
}
