use std::sync::Arc;
use std::time::Instant;

use catalog::{CatalogBackend, CatalogError, Row, SchemaRegistry, TableSchema, ID_COLUMN};

use crate::metrics::{EvalPath, MatchMetrics};
use crate::scorer::{QueryValue, Scorer};
use crate::types::{
    MatchError, MatchHit, MatchRequest, MatchResult, SelectionMode, MAX_QUERY_CHARS,
};


/// A constraint resolved against its table's schema.
#[derive(Debug)]
struct PreparedConstraint {
    column: String,
    position: usize,
    query: QueryValue,
}

/// Matcher for evaluating lookups against catalog tables.
///
/// Holds the immutable schema registry and the backend behind `Arc`s, so one
/// instance can serve any number of concurrent requests.
pub struct Matcher {
    registry: Arc<SchemaRegistry>,
    backend: Arc<dyn CatalogBackend>,
    scorer: Scorer,
    metrics: Option<Arc<dyn MatchMetrics>>,
}

impl Matcher {
    /// Construct a matcher over an initialized registry and its backend.
    pub fn new(registry: Arc<SchemaRegistry>, backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            registry,
            backend,
            scorer: Scorer::default(),
            metrics: None,
        }
    }

    /// Introspect `tables` from `backend` and build a matcher over them.
    pub fn initialize<S: AsRef<str>>(
        backend: Arc<dyn CatalogBackend>,
        tables: &[S],
    ) -> Result<Self, MatchError> {
        let registry = SchemaRegistry::initialize(backend.as_ref(), tables)?;
        Ok(Self::new(Arc::new(registry), backend))
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Evaluate one request.
    ///
    /// Table and column validation happen before any row is read. A missing
    /// row is an empty result, never an error.
    pub fn evaluate(&self, req: &MatchRequest) -> Result<MatchResult, MatchError> {
        let start = Instant::now();

        let schema = self.registry.schema(&req.table).map_err(|err| match err {
            CatalogError::UnknownTable(table) => MatchError::UnknownTable(table),
            other => MatchError::Catalog(other),
        })?;
        let prepared = prepare(schema, req)?;

        let fast = match fast_path_id(req, &prepared) {
            Some(id) => self.lookup_by_id(schema, id, &prepared)?,
            None => None,
        };
        let (path, hits) = match fast {
            Some(hits) => (EvalPath::FastPath, hits),
            None => (EvalPath::Scan, self.scan(schema, &prepared, req.fuzzy)?),
        };

        let result = match req.mode {
            SelectionMode::All => MatchResult::All(hits),
            SelectionMode::Best => MatchResult::Best(select_best(hits)),
        };

        let latency = start.elapsed();
        tracing::debug!(
            table = %req.table,
            path = path.as_str(),
            fuzzy = req.fuzzy,
            mode = %req.mode,
            hits = result.len(),
            latency_us = latency.as_micros() as u64,
            "evaluated lookup"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_evaluation(&req.table, path, latency, result.len());
        }

        Ok(result)
    }

    /// `None` when the identifier is not unique and the table must be scanned.
    fn lookup_by_id(
        &self,
        schema: &TableSchema,
        id: i64,
        prepared: &[PreparedConstraint],
    ) -> Result<Option<Vec<MatchHit>>, MatchError> {
        match self.backend.fetch_by_id(schema.name(), id) {
            Ok(Some(row)) => Ok(Some(
                self.accept(schema, row, prepared, false).into_iter().collect(),
            )),
            Ok(None) => Ok(Some(Vec::new())),
            Err(CatalogError::DuplicateId { .. }) => {
                tracing::debug!(table = schema.name(), id, "identifier shared by several rows, scanning");
                Ok(None)
            }
            Err(err) if err.is_row_level() => {
                self.skip_row(schema.name(), &err);
                Ok(Some(Vec::new()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn scan(
        &self,
        schema: &TableSchema,
        prepared: &[PreparedConstraint],
        fuzzy: bool,
    ) -> Result<Vec<MatchHit>, MatchError> {
        let mut hits = Vec::new();
        self.backend.scan(schema.name(), &mut |row| match row {
            Ok(row) => {
                if let Some(hit) = self.accept(schema, row, prepared, fuzzy) {
                    hits.push(hit);
                }
            }
            Err(err) => self.skip_row(schema.name(), &err),
        })?;
        Ok(hits)
    }

    /// Score `row` against every constraint; `None` unless all of them pass.
    fn accept(
        &self,
        schema: &TableSchema,
        row: Row,
        prepared: &[PreparedConstraint],
        fuzzy: bool,
    ) -> Option<MatchHit> {
        if row.columns() != schema.columns() {
            let err = CatalogError::Decode {
                table: schema.name().to_string(),
                reason: "row layout does not match the registered schema".into(),
            };
            self.skip_row(schema.name(), &err);
            return None;
        }

        let mut score = 0u32;
        for constraint in prepared {
            let stored = row.value_at(constraint.position)?;
            let verdict = self.scorer.score(stored, &constraint.query, fuzzy)?;
            score = score.saturating_add(verdict.score);
        }
        Some(MatchHit { row, score })
    }

    fn skip_row(&self, table: &str, err: &CatalogError) {
        tracing::warn!(table, error = %err, "skipping row");
        if let Some(metrics) = &self.metrics {
            metrics.record_row_skipped(table);
        }
    }
}

/// Resolve every constraint column before any row is touched.
fn prepare(schema: &TableSchema, req: &MatchRequest) -> Result<Vec<PreparedConstraint>, MatchError> {
    req.effective_constraints()
        .into_iter()
        .map(|constraint| {
            if constraint.raw_value.chars().count() > MAX_QUERY_CHARS {
                return Err(MatchError::InvalidRequest(format!(
                    "value for '{}' exceeds {MAX_QUERY_CHARS} characters",
                    constraint.column
                )));
            }
            let position = schema
                .position(&constraint.column)
                .ok_or_else(|| MatchError::UnknownColumn {
                    table: schema.name().to_string(),
                    column: constraint.column.clone(),
                })?;
            Ok(PreparedConstraint {
                query: QueryValue::parse(&constraint.raw_value),
                column: constraint.column,
                position,
            })
        })
        .collect()
}

/// The identifier to fetch directly, when the request is a plain id lookup.
fn fast_path_id(req: &MatchRequest, prepared: &[PreparedConstraint]) -> Option<i64> {
    match prepared {
        [only] if !req.fuzzy && only.column == ID_COLUMN => only.query.as_integer(),
        _ => None,
    }
}

/// Highest score wins; equal scores go to the smaller identifier, with rows
/// lacking one ranked as identifier 0. Remaining ties keep table order.
fn select_best(hits: Vec<MatchHit>) -> Option<MatchHit> {
    hits.into_iter().reduce(|best, candidate| {
        let candidate_id = candidate.row.identifier().unwrap_or(0);
        let best_id = best.row.identifier().unwrap_or(0);
        if candidate.score > best.score
            || (candidate.score == best.score && candidate_id < best_id)
        {
            candidate
        } else {
            best
        }
    })
}
