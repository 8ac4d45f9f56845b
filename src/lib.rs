//! Workspace umbrella crate for dom6api.
//!
//! This crate stitches the catalog and matcher layers together so callers
//! can serve table lookups with a single entry point: [`LookupService`]
//! validates a request, evaluates it and returns the shaped response body.

pub mod config;

pub use catalog::{
    BackendConfig, CatalogBackend, CatalogError, InMemoryBackend, Row, SchemaRegistry,
    TableSchema, Value, ID_COLUMN,
};
#[cfg(feature = "backend-sqlite")]
pub use catalog::SqliteBackend;
pub use config::{ApiConfig, ConfigLoadError};
pub use matcher::{
    Constraint, EvalPath, MatchError, MatchHit, MatchMetrics, MatchRequest, MatchResult, Matcher,
    ResultShaper, Scorer, ScorerConfig, SelectionMode, ShapedRecord, ShapedResponse,
    MAX_QUERY_CHARS,
};

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors raised while assembling a [`LookupService`].
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("data source error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("matcher error: {0}")]
    Match(#[from] MatchError),
}

/// Schema-validated lookups plus response shaping, ready to share across
/// request handlers behind an `Arc`.
pub struct LookupService {
    matcher: Matcher,
    shaper: ResultShaper,
}

impl LookupService {
    pub fn new(matcher: Matcher, shaper: ResultShaper) -> Self {
        Self { matcher, shaper }
    }

    /// Build the configured backend, introspect every configured table and
    /// wire up the matcher.
    pub fn from_config(config: &ApiConfig) -> Result<Self, LookupError> {
        config.validate()?;
        let start = Instant::now();
        let backend = config.backend_config().build(&config.tables)?;
        tracing::info!(
            backend = backend.kind(),
            tables = config.tables.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "data source ready"
        );
        Self::with_backend(config, backend)
    }

    /// Like [`LookupService::from_config`], over an already built backend.
    pub fn with_backend(
        config: &ApiConfig,
        backend: Arc<dyn CatalogBackend>,
    ) -> Result<Self, LookupError> {
        let scorer = Scorer::new(config.scorer_config())?;
        let matcher = Matcher::initialize(backend, &config.tables)?.with_scorer(scorer);
        Ok(Self::new(matcher, ResultShaper::new(config.data_root.clone())))
    }

    pub fn with_metrics(self, metrics: Arc<dyn MatchMetrics>) -> Self {
        Self {
            matcher: self.matcher.with_metrics(metrics),
            ..self
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn shaper(&self) -> &ResultShaper {
        &self.shaper
    }

    /// Registered table names, in configuration order.
    pub fn tables(&self) -> Vec<String> {
        self.matcher
            .registry()
            .tables()
            .map(str::to_string)
            .collect()
    }

    /// Evaluate `req` and shape the rows it matched.
    ///
    /// A request that matches nothing yields an empty collection.
    pub fn lookup(&self, req: &MatchRequest) -> Result<ShapedResponse, MatchError> {
        let result = self.matcher.evaluate(req)?;
        Ok(self.shaper.shape(&req.table, result.into_rows()))
    }
}
