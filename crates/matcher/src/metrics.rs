// Metrics hooks for the `matcher` crate.
//
// Callers attach a `MatchMetrics` implementation to a `Matcher` via
// `Matcher::with_metrics`; the matcher then reports per-request latency, hit
// counts and skipped rows. This keeps instrumentation decoupled from any
// specific metrics backend.
use std::time::Duration;

/// How an evaluation reached its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPath {
    /// Direct identifier lookup.
    FastPath,
    /// Full table scan.
    Scan,
}

impl EvalPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalPath::FastPath => "fast_path",
            EvalPath::Scan => "scan",
        }
    }
}

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Record the outcome of one successful evaluation.
    ///
    /// `hit_count` is the number of rows returned to the caller after
    /// selection.
    fn record_evaluation(&self, table: &str, path: EvalPath, latency: Duration, hit_count: usize);

    /// Record a stored row that could not be decoded and was skipped.
    fn record_row_skipped(&self, _table: &str) {}
}
