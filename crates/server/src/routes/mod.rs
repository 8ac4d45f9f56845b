//! API route handlers
//!
//! This module contains all HTTP endpoint implementations for the dom6api
//! server. Routes are organized by functionality:
//!
//! - `health`: Health checks, readiness, and metrics
//! - `lookup`: Table and identifier lookups

pub mod health;
pub mod lookup;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// API version and base info
///
/// Returns server information including version and the table endpoints.
/// This is the root endpoint (GET /).
///
/// # Response
///
/// ```json
/// {
///   "name": "dom6api",
///   "version": "0.1.0",
///   "tables": ["items", "spells"],
///   "endpoints": ["/items", "/items/{id}", "..."]
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let tables = state.service.tables();
    let mut endpoints: Vec<String> = tables
        .iter()
        .flat_map(|table| [format!("/{table}"), format!("/{table}/{{id}}")])
        .collect();
    endpoints.extend(["/health", "/ready", "/metrics"].map(String::from));

    Ok(Json(json!({
        "name": "dom6api",
        "version": env!("CARGO_PKG_VERSION"),
        "tables": tables,
        "endpoints": endpoints,
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
