//! # dom6api Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the catalog layer (`catalog`). It turns a lookup
//! request (a table, an optional identifier taken from the request path, and
//! a set of column constraints) into the rows that satisfy it, and shapes
//! those rows into the response body.
//!
//! ## Core Types
//!
//! - [`MatchRequest`]: table, path identifier, constraints, fuzzy flag and
//!   [`SelectionMode`].
//! - [`Scorer`]: per-cell comparison. Exact mode compares sanitized,
//!   case-folded text and parsed numbers; fuzzy mode relaxes text cells with
//!   substring containment and similarity ratios (thresholds 70 / 85).
//! - [`Matcher`]: validates the request against the [`catalog::SchemaRegistry`],
//!   takes the identifier fast path when it can, otherwise scans the table.
//! - [`MatchResult`]: every passing row (`All`) or the single best one (`Best`).
//! - [`ResultShaper`]: adds the computed `image` field and picks the
//!   collection key.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use catalog::{InMemoryBackend, Value};
//! use matcher::{MatchRequest, Matcher, ResultShaper, SelectionMode};
//!
//! let backend = InMemoryBackend::new()
//!     .with_table(
//!         "units",
//!         &["id", "name"],
//!         vec![
//!             vec![Value::Integer(1), Value::from("Longbowman")],
//!             vec![Value::Integer(2), Value::from("Long Spearman")],
//!         ],
//!     )
//!     .unwrap();
//! let matcher = Matcher::initialize(Arc::new(backend), &["units"]).unwrap();
//!
//! let req = MatchRequest::new("units")
//!     .with_constraint("name", "long")
//!     .with_fuzzy(true)
//!     .with_mode(SelectionMode::Best);
//! let result = matcher.evaluate(&req).unwrap();
//!
//! let body = ResultShaper::default().shape("units", result.into_rows());
//! assert_eq!(body.key(), "units");
//! assert_eq!(body.records()[0].image(), Some("Data/Units/1.png"));
//! ```
//!
//! ## Observability
//!
//! Attach a [`MatchMetrics`] implementation with [`Matcher::with_metrics`] to
//! record per-request latency, hit counts and skipped rows.

pub mod engine;
pub mod metrics;
pub mod scorer;
pub mod shape;
pub mod types;

pub use crate::engine::Matcher;
pub use crate::metrics::{EvalPath, MatchMetrics};
pub use crate::scorer::{MatchKind, QueryValue, Scorer, ScorerConfig, Verdict};
pub use crate::shape::{ResultShaper, ShapedRecord, ShapedResponse};
pub use crate::types::{
    Constraint, MatchError, MatchHit, MatchRequest, MatchResult, SelectionMode, MAX_QUERY_CHARS,
};
