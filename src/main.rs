use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

use stock_ingest::config::{Config, ConfigError, StoreConfig, StoreEndpoint};
use stock_ingest::ingest::Ingestor;
use stock_ingest::marketdata::api_caller::AlphaVantage;
use stock_ingest::model;
use stock_ingest::server;
use stock_ingest::store::{price::PriceStore, rest::RestStore, sqlite};

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    // Run the HTTP ingestion service.
    Serve,
    // Ingest the latest intraday quotes for one symbol.
    Ingest { symbol: String },
    // Print stored prices for a symbol, oldest first.
    History {
        symbol: String,
        // Only rows at or after this RFC 3339 instant.
        #[arg(long)]
        since: Option<String>,
    },
    // Create the stock_prices table in a sqlite store.
    InitDb,
}

fn open_store(config: &StoreConfig) -> Result<Arc<dyn PriceStore>, String> {
    match &config.store {
        StoreEndpoint::Rest(url) => RestStore::new(url, config.store_key.clone())
            .map(|s| Arc::new(s) as Arc<dyn PriceStore>)
            .map_err(|e| e.to_string()),
        StoreEndpoint::Sqlite(path) => {
            sqlite::SqliteStore::open(path).map(|s| Arc::new(s) as Arc<dyn PriceStore>)
        }
    }
}

fn load<T>(result: Result<T, ConfigError>) -> T {
    match result {
        Ok(config) => config,
        Err(err) => {
            log::error!("Server configuration error: {}", err);
            std::process::exit(1);
        }
    }
}

fn store_or_exit(config: &StoreConfig) -> Arc<dyn PriceStore> {
    match open_store(config) {
        Ok(store) => store,
        Err(err) => {
            log::error!("Error initializing store: {}", err);
            std::process::exit(1);
        }
    }
}

// Only serve and ingest talk to the quote provider.
fn ingestor_or_exit() -> (Config, Ingestor) {
    let config = load(Config::from_env());
    let store = store_or_exit(&config.store);
    let source = Arc::new(AlphaVantage::new(
        config.api_base_url.clone(),
        config.api_key.clone(),
    ));
    (config, Ingestor::new(source, store))
}

#[tokio::main]
// Main function entry point.
async fn main() {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Commands::Serve => {
            let (config, ingestor) = ingestor_or_exit();
            if let Err(err) = server::serve(config.listen_addr, ingestor).await {
                log::error!("Server error: {}", err);
                std::process::exit(1);
            }
        }

        Commands::Ingest { symbol } => {
            let (_, ingestor) = ingestor_or_exit();
            match ingestor.ingest(&symbol).await {
                Ok(_) => log::info!("Stock prices for {} updated successfully", symbol),
                Err(err) => {
                    log::error!("Error ingesting {}: {}", symbol, err);
                    std::process::exit(1);
                }
            }
        }

        Commands::History { symbol, since } => {
            let since = match since.as_deref().map(model::parse_canonical).transpose() {
                Ok(since) => since,
                Err(err) => {
                    log::error!("Invalid --since value: {}", err);
                    std::process::exit(2);
                }
            };
            let store = store_or_exit(&load(StoreConfig::from_env()));
            match store.history(&symbol, since.as_ref()).await {
                Ok(records) => {
                    for record in records {
                        println!("{}\t{}", record.canonical_timestamp(), record.price);
                    }
                }
                Err(err) => {
                    log::error!("Error reading history for {}: {}", symbol, err);
                    std::process::exit(1);
                }
            }
        }

        Commands::InitDb => {
            let config = load(StoreConfig::from_env());
            match &config.store {
                StoreEndpoint::Sqlite(path) => {
                    // Opening a sqlite store creates the table.
                    store_or_exit(&config);
                    log::info!("stock_prices ready in {}", path.display());
                }
                StoreEndpoint::Rest(_) => {
                    log::error!("init-db only applies to sqlite: endpoints");
                    std::process::exit(2);
                }
            }
        }
    }
}
