//! # dom6api Catalog
//!
//! This crate holds the read-only data side of dom6api: typed scalar values,
//! rows, per-table schemas and the backends that produce them. It is the
//! upstream contract the matcher builds on; nothing here knows about fuzzy
//! scoring or HTTP.
//!
//! ## Core Features
//!
//! - **Typed values**: every stored cell is a [`Value`] tagged as integer,
//!   float, text or null, so comparison code dispatches on the tag instead of
//!   guessing at runtime types.
//! - **Schema registry**: [`SchemaRegistry`] introspects every configured
//!   table exactly once at startup and is immutable afterwards. Share it
//!   behind an `Arc`; reads need no locking.
//! - **Pluggable backends**: the [`CatalogBackend`] trait abstracts the data
//!   source. Out of the box it provides:
//!   - [`InMemoryBackend`], an immutable snapshot with an identifier index
//!     (ideal for tests and for serving a fully loaded dataset).
//!   - `SqliteBackend`, a read-only SQLite connection queried per request
//!     (enabled via the `backend-sqlite` feature, on by default).
//!
//! ## Example Usage
//!
//! ```
//! use catalog::{InMemoryBackend, SchemaRegistry, Value};
//!
//! let backend = InMemoryBackend::new()
//!     .with_table(
//!         "units",
//!         &["id", "name"],
//!         vec![vec![Value::Integer(1), Value::from("Longbowman")]],
//!     )
//!     .unwrap();
//!
//! let registry = SchemaRegistry::initialize(&backend, &["units"]).unwrap();
//! assert_eq!(registry.columns_of("units").unwrap(), ["id", "name"]);
//! assert!(registry.has_column("units", "name"));
//! ```

mod backend;
mod schema;

#[cfg(feature = "backend-sqlite")]
pub use backend::SqliteBackend;
pub use backend::{BackendConfig, CatalogBackend, InMemoryBackend};
pub use schema::{SchemaRegistry, TableSchema};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name of the identifier column every entity table carries.
pub const ID_COLUMN: &str = "id";

/// A single stored cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an entity identifier.
    ///
    /// Integers are taken as-is, integral floats are truncated and text is
    /// parsed after trimming. Anything else has no identifier.
    pub fn as_identifier(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Integer(v) => serde_json::Value::from(v),
            // Non-finite floats have no JSON form.
            Value::Float(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// One record of a table: the table's ordered column names plus one value
/// per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row, rejecting a value count that disagrees with the columns.
    pub fn new(
        table: &str,
        columns: Arc<[String]>,
        values: Vec<Value>,
    ) -> Result<Self, CatalogError> {
        if columns.len() != values.len() {
            return Err(CatalogError::Decode {
                table: table.to_string(),
                reason: format!(
                    "expected {} values, found {}",
                    columns.len(),
                    values.len()
                ),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn value_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Identifier of this row, if it has a parseable `id` column.
    pub fn identifier(&self) -> Option<i64> {
        self.get(ID_COLUMN).and_then(Value::as_identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Errors produced by the catalog layer.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Generic backend failure (I/O, poisoned lock, ...).
    #[error("backend error: {0}")]
    Backend(String),
    /// A configured table does not exist in the data source.
    #[error("table '{0}' is not present in the data source")]
    MissingTable(String),
    /// A lookup named a table the registry does not know.
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// A stored row could not be decoded into typed values.
    #[error("failed to decode row of '{table}': {reason}")]
    Decode { table: String, reason: String },
    /// More than one row carries the identifier a single-row fetch asked for.
    #[error("identifier {id} is not unique in '{table}'")]
    DuplicateId { table: String, id: i64 },
    /// A table name that cannot be used as an SQL identifier.
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),
    #[cfg(feature = "backend-sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl CatalogError {
    pub fn backend(msg: impl Into<String>) -> Self {
        CatalogError::Backend(msg.into())
    }

    /// Whether this error concerns a single row rather than the whole source.
    pub fn is_row_level(&self) -> bool {
        matches!(self, CatalogError::Decode { .. })
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Backend(format!("io error: {err}"))
    }
}
