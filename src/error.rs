use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures talking to the activities server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server rejected request with status {status}")]
    Rejected { status: u16, detail: Option<String> },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid url: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddr { name: &'static str, value: String },
    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidTimeout { name: &'static str, value: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors surfaced by the web layer
#[derive(Debug, Error)]
pub enum WebError {
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
