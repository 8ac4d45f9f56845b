//! dom6api Server - HTTP REST API for game table lookups
//!
//! This crate exposes [`dom6api::LookupService`] over HTTP. Every registered
//! table is served under its own path prefix:
//!
//! - **Table lookups**: `GET /{table}?column=value` filters on any column
//! - **Identifier lookups**: `GET /{table}/{id}` with a fast path for ids
//! - **Fuzzy matching**: `match=fuzzy` relaxes text comparisons,
//!   `mode=best` returns only the single best match
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Features
//!
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: Environment variable and file-based configuration
//! - **Error Handling**: JSON error bodies with stable error codes
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information and registered tables
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /{table}` - Filter a table by query parameters
//! - `GET /{table}/{id}` - Look up one row by identifier

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
