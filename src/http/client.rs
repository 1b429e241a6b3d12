use reqwest::{self, RequestBuilder};
use serde::de::DeserializeOwned;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

// Shared HTTP client instance.
lazy_static::lazy_static! {
    static ref CLIENT: Arc<reqwest::Client> = Arc::new(reqwest::Client::new());
}

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP error: {0} returned {1}. Response body: {2}")]
    HttpError(reqwest::Url, u16, String),
    #[error("Error deserializing JSON: {0}")]
    JsonError(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Other error: {0}")]
    Other(String),
}

pub enum Method {
    Get,
    Post(Option<Vec<u8>>),
}

/// Makes an HTTP request and returns the raw response body.
pub async fn send(
    method: Method,
    path: &str,                   // Absolute url.
    params: HashMap<&str, &str>,  // Optional query parameters.
    headers: HashMap<&str, &str>, // Optional header parameters.
    token: Option<&str>,
) -> Result<String, RequestError> {
    // Construct the URL.
    let url = if !params.is_empty() {
        reqwest::Url::parse_with_params(path, &params)
            .map_err(|e| RequestError::Other(e.to_string()))?
    } else {
        reqwest::Url::parse(path).map_err(|e| RequestError::Other(e.to_string()))?
    };

    // Construct the request
    let mut req: RequestBuilder = match method {
        Method::Get => CLIENT.get(url.as_str()),
        Method::Post(body) => {
            let req = CLIENT.post(url.as_str());
            match body {
                Some(body) => req.body(body),
                None => req,
            }
        }
    };

    if let Some(token) = token {
        req = req.bearer_auth(token)
    }

    for (k, v) in headers {
        req = req.header(k, v);
    }

    let response = req
        .send()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RequestError::HttpError(url, status.as_u16(), body));
    }
    Ok(body)
}

/// Makes an HTTP request and deserializes the JSON response.
pub async fn request<T: DeserializeOwned>(
    method: Method,
    path: &str,
    params: HashMap<&str, &str>,
    headers: HashMap<&str, &str>,
    token: Option<&str>,
) -> Result<T, RequestError> {
    let body = send(method, path, params, headers, token).await?;
    serde_json::from_str(&body).map_err(|e| RequestError::JsonError(e.to_string()))
}
