use std::any::Any;
use std::net::SocketAddr;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::ingest::{IngestError, Ingestor};
use crate::model::IngestRequest;

pub const INGEST_PATH: &str = "/fetch-stock-price";

const PROCESSING_ERROR: &str = "Error processing request";

// App State
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
}

pub fn router(ingestor: Ingestor) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            INGEST_PATH,
            post(fetch_stock_price).fallback(method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(AppState { ingestor })
}

pub async fn serve(addr: SocketAddr, ingestor: Ingestor) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", addr);
    axum::serve(listener, router(ingestor)).await
}

async fn health_check() -> &'static str {
    "OK"
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Invalid request method").into_response()
}

async fn fetch_stock_price(State(state): State<AppState>, body: Bytes) -> Response {
    let request: IngestRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            log::error!("{}: {}", PROCESSING_ERROR, err);
            return (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR).into_response();
        }
    };

    let symbol = match request.symbol {
        Some(symbol) if !symbol.is_empty() => symbol,
        _ => return (StatusCode::BAD_REQUEST, "Stock symbol is required").into_response(),
    };

    match state.ingestor.ingest(&symbol).await {
        Ok(_) => (
            StatusCode::OK,
            format!("Stock prices for {} updated successfully", symbol),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        log::error!("{}", self);
        let message = match &self {
            IngestError::MissingTimeSeries(_) => "Error fetching stock price data".to_string(),
            IngestError::Insert { timestamp, .. } => format!("Error inserting data for {}", timestamp),
            IngestError::Fetch(_) | IngestError::Decode(_) => PROCESSING_ERROR.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("{}: {}", PROCESSING_ERROR, detail);
    (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR).into_response()
}
