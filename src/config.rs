use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;
use url::Url;

use crate::constants;

const ENV_STORE_URL: &str = "PROJECT_SUPABASE_URL";
const ENV_STORE_KEY: &str = "PROJECT_SUPABASE_KEY";
const ENV_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
const ENV_API_BASE_URL: &str = "ALPHA_VANTAGE_BASE_URL";
const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable '{0}' not set")]
    Missing(&'static str),
    #[error("Invalid store endpoint '{0}': expected http(s):// or sqlite:<path>")]
    InvalidStoreUrl(String),
    #[error("Invalid provider base url '{0}'")]
    InvalidProviderUrl(String),
    #[error("Invalid listen address '{0}'")]
    InvalidListenAddr(String),
}

/// Where ingested prices are written.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEndpoint {
    /// PostgREST endpoint, e.g. a Supabase project url.
    Rest(Url),
    /// Local SQLite file.
    Sqlite(PathBuf),
}

impl StoreEndpoint {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if let Some(path) = raw.strip_prefix("sqlite:") {
            let path = path.trim_start_matches("//");
            if path.is_empty() {
                return Err(ConfigError::InvalidStoreUrl(raw.into()));
            }
            return Ok(StoreEndpoint::Sqlite(PathBuf::from(path)));
        }
        let url = Url::parse(raw).map_err(|_| ConfigError::InvalidStoreUrl(raw.into()))?;
        match url.scheme() {
            "http" | "https" => Ok(StoreEndpoint::Rest(url)),
            _ => Err(ConfigError::InvalidStoreUrl(raw.into())),
        }
    }
}

// Blank values count as missing.
fn read<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    read(lookup, name).ok_or(ConfigError::Missing(name))
}

/// Store endpoint and credential. Enough for the read-only and local commands.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub store: StoreEndpoint,
    pub store_key: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_url = required(&lookup, ENV_STORE_URL)?;
        let store_key = required(&lookup, ENV_STORE_KEY)?;
        Ok(StoreConfig {
            store: StoreEndpoint::parse(&store_url)?,
            store_key,
        })
    }
}

/// Settings for ingesting: store, provider and listen address, validated
/// once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub api_key: String,
    pub api_base_url: Url,
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig::from_lookup(&lookup)?;
        let api_key = required(&lookup, ENV_API_KEY)?;

        let base = read(&lookup, ENV_API_BASE_URL)
            .unwrap_or_else(|| constants::ALPHA_VANTAGE_BASE_URL.into());
        let api_base_url = Url::parse(&base).map_err(|_| ConfigError::InvalidProviderUrl(base))?;

        let addr = read(&lookup, ENV_LISTEN_ADDR)
            .unwrap_or_else(|| constants::DEFAULT_LISTEN_ADDR.into());
        let listen_addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(addr))?;

        Ok(Config {
            store,
            api_key,
            api_base_url,
            listen_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const COMPLETE: [(&str, &str); 3] = [
        ("PROJECT_SUPABASE_URL", "https://abc.supabase.co"),
        ("PROJECT_SUPABASE_KEY", "service-key"),
        ("ALPHA_VANTAGE_API_KEY", "demo"),
    ];

    #[test]
    fn complete_config_uses_defaults() {
        let config = Config::from_lookup(lookup(&COMPLETE)).unwrap();
        assert_eq!(
            config.store.store,
            StoreEndpoint::Rest(Url::parse("https://abc.supabase.co").unwrap())
        );
        assert_eq!(config.store.store_key, "service-key");
        assert_eq!(config.api_key, "demo");
        assert_eq!(config.api_base_url.as_str(), "https://www.alphavantage.co/query");
        assert_eq!(config.listen_addr, "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn each_required_variable_is_checked() {
        for skipped in 0..COMPLETE.len() {
            let vars: Vec<_> = COMPLETE
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skipped)
                .map(|(_, kv)| *kv)
                .collect();
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert_eq!(err, ConfigError::Missing(COMPLETE[skipped].0));
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut vars = COMPLETE.to_vec();
        vars[2] = ("ALPHA_VANTAGE_API_KEY", "   ");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ALPHA_VANTAGE_API_KEY"));
    }

    #[test]
    fn store_config_does_not_need_the_provider_key() {
        let vars = [
            ("PROJECT_SUPABASE_URL", "sqlite:prices.db"),
            ("PROJECT_SUPABASE_KEY", "local"),
        ];
        let store = StoreConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(store.store, StoreEndpoint::Sqlite(PathBuf::from("prices.db")));
        assert_eq!(store.store_key, "local");

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ALPHA_VANTAGE_API_KEY"));

        let err = StoreConfig::from_lookup(lookup(&vars[..1])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PROJECT_SUPABASE_KEY"));
    }

    #[test]
    fn sqlite_endpoint() {
        assert_eq!(
            StoreEndpoint::parse("sqlite:prices.db").unwrap(),
            StoreEndpoint::Sqlite(PathBuf::from("prices.db"))
        );
        assert_eq!(
            StoreEndpoint::parse("sqlite:///tmp/prices.db").unwrap(),
            StoreEndpoint::Sqlite(PathBuf::from("/tmp/prices.db"))
        );
        assert!(StoreEndpoint::parse("sqlite:").is_err());
        assert!(StoreEndpoint::parse("ftp://example.com").is_err());
        assert!(StoreEndpoint::parse("not a url").is_err());
    }

    #[test]
    fn invalid_listen_addr() {
        let mut vars = COMPLETE.to_vec();
        vars.push(("LISTEN_ADDR", "localhost"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidListenAddr("localhost".into()));
    }
}
