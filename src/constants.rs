// Default query endpoint of the Alpha Vantage API.
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

// Intraday time series function name.
pub const INTRADAY_FUNCTION: &str = "TIME_SERIES_INTRADAY";

// Bar granularity requested from the provider. The series key in the
// response embeds this value, e.g. "Time Series (60min)".
pub const INTERVAL: &str = "60min";

// Field of each bar holding the closing price.
pub const CLOSE_FIELD: &str = "4. close";

// Table holding the ingested prices.
pub const PRICES_TABLE: &str = "stock_prices";

// Address the HTTP service binds to when LISTEN_ADDR is not set.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
