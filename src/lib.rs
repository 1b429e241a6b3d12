// Provider client and payload decoding.
pub mod marketdata {
    // Quote source trait and the Alpha Vantage client.
    pub mod api_caller;
    // Typed decode of intraday responses.
    pub mod response;
}
// HTTP client module.
pub mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data storage module.
pub mod store {
    /// Store trait and errors.
    pub mod price;
    /// PostgREST backed store.
    pub mod rest;
    /// SQLite database interaction.
    pub mod sqlite;
}
// Process configuration.
pub mod config;
// module storing defaults
pub mod constants;
// Fetch, dedupe and insert.
pub mod ingest;
// Data models.
pub mod model;
// HTTP surface.
pub mod server;
