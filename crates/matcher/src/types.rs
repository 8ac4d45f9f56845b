use catalog::{CatalogError, Row, ID_COLUMN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::scorer::sanitize;

/// Longest raw constraint value accepted, in characters.
pub const MAX_QUERY_CHARS: usize = 128;

/// How passing rows are turned into a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every row that satisfies all constraints, in table order.
    #[default]
    All,
    /// The single highest-scoring row; ties go to the smaller identifier.
    Best,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::All => "all",
            SelectionMode::Best => "best",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SelectionMode::All),
            "best" => Ok(SelectionMode::Best),
            other => Err(MatchError::InvalidRequest(format!(
                "unknown selection mode '{other}'"
            ))),
        }
    }
}

/// A single column/value filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    pub column: String,
    pub raw_value: String,
}

impl Constraint {
    pub fn new(column: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// One lookup against one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRequest {
    pub table: String,
    /// Trailing path segment after the table prefix, if any.
    #[serde(default)]
    pub path_identifier: Option<String>,
    /// Column filters; at most one per column.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default)]
    pub mode: SelectionMode,
}

impl MatchRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            path_identifier: None,
            constraints: Vec::new(),
            fuzzy: false,
            mode: SelectionMode::All,
        }
    }

    pub fn with_path_identifier(mut self, id: impl Into<String>) -> Self {
        self.path_identifier = Some(id.into());
        self
    }

    /// Add a constraint, replacing any earlier one on the same column.
    pub fn with_constraint(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        let constraint = Constraint::new(column, value);
        match self
            .constraints
            .iter_mut()
            .find(|c| c.column == constraint.column)
        {
            Some(existing) => *existing = constraint,
            None => self.constraints.push(constraint),
        }
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// The path identifier after sanitization, when it leaves anything behind.
    pub fn sanitized_path_identifier(&self) -> Option<String> {
        self.path_identifier
            .as_deref()
            .map(sanitize)
            .filter(|id| !id.is_empty())
    }

    /// Constraints with the path identifier folded in as an `id` constraint.
    /// The path wins over an explicit `id` filter.
    pub fn effective_constraints(&self) -> Vec<Constraint> {
        let mut constraints = self.constraints.clone();
        if let Some(id) = self.sanitized_path_identifier() {
            constraints.retain(|c| c.column != ID_COLUMN);
            constraints.push(Constraint::new(ID_COLUMN, id));
        }
        constraints
    }
}

/// A row that passed every constraint, with its cumulative score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub row: Row,
    pub score: u32,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    All(Vec<MatchHit>),
    Best(Option<MatchHit>),
}

impl MatchResult {
    pub fn hits(&self) -> &[MatchHit] {
        match self {
            MatchResult::All(hits) => hits,
            MatchResult::Best(hit) => hit.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits().is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            MatchResult::All(hits) => hits.into_iter().map(|h| h.row).collect(),
            MatchResult::Best(hit) => hit.into_iter().map(|h| h.row).collect(),
        }
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The table is not in the schema registry.
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// A constraint names a column the table does not have.
    #[error("unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },
    /// Malformed request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Invalid scorer or matcher configuration.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The data source failed as a whole.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl MatchError {
    /// Whether the caller, not the service, is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            MatchError::UnknownTable(_)
                | MatchError::UnknownColumn { .. }
                | MatchError::InvalidRequest(_)
        )
    }
}
