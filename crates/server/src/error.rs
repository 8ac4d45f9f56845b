use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dom6api::{LookupError, MatchError};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Match(#[from] MatchError),

    #[error("Startup error: {0}")]
    Startup(#[from] LookupError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Match(err) if err.is_caller_error() => StatusCode::BAD_REQUEST,
            ServerError::Match(_)
            | ServerError::Startup(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Match(MatchError::UnknownTable(_)) => "UNKNOWN_TABLE",
            ServerError::Match(MatchError::UnknownColumn { .. }) => "UNKNOWN_COLUMN",
            ServerError::Match(MatchError::InvalidRequest(_)) => "BAD_REQUEST",
            ServerError::Match(MatchError::Catalog(_)) => "CATALOG_ERROR",
            ServerError::Match(MatchError::InvalidConfig(_)) => "CONFIG_ERROR",
            ServerError::Startup(_) => "STARTUP_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = %error_code, error = %message, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("lookup task failed: {err}"))
    }
}
