use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

use crate::constants;
use crate::http::client::{self, RequestError};

/// Source of intraday quote batches.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the raw intraday document for `symbol` at `interval`.
    async fn intraday(&self, symbol: &str, interval: &str) -> Result<Value, RequestError>;
}

/// Alpha Vantage query api.
pub struct AlphaVantage {
    base_url: Url,
    api_key: String,
}

impl AlphaVantage {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        AlphaVantage {
            base_url,
            api_key: api_key.into(),
        }
    }

    // Query parameters of an intraday call.
    fn intraday_params<'a>(&'a self, symbol: &'a str, interval: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([
            ("function", constants::INTRADAY_FUNCTION),
            ("symbol", symbol),
            ("interval", interval),
            ("apikey", self.api_key.as_str()),
        ])
    }
}

#[async_trait]
impl QuoteSource for AlphaVantage {
    async fn intraday(&self, symbol: &str, interval: &str) -> Result<Value, RequestError> {
        log::debug!("Fetching {} intraday quotes for {}", interval, symbol);
        client::request::<Value>(
            client::Method::Get,
            self.base_url.as_str(),
            self.intraday_params(symbol, interval),
            HashMap::new(),
            None,
        )
        .await
    }
}
