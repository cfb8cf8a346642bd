//! Voice Intent Server
//!
//! Exposes the turn API over HTTP and ships the demo scripts.

pub mod http;
pub mod scripts;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use voice_intent_agent::{EngineError, ModelError};
use voice_intent_config::ConfigError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Script error: {0}")]
    Script(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        ServerError::Session(err.to_string())
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Session(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Script(_) | ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
