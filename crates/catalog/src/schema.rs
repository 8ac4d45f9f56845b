use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{CatalogBackend, CatalogError};

/// Column layout of one table.
///
/// `columns` follows physical storage order and is the order records are
/// serialized in; `column_set` is exactly its set form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Arc<[String]>,
    column_set: HashSet<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let column_set = columns.iter().cloned().collect();
        Self {
            name: name.into(),
            columns: columns.into(),
            column_set,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the ordered column list, for building rows.
    pub fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_set.contains(column)
    }

    /// Physical position of `column`.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Every known table's schema, introspected once at startup.
///
/// The registry has no interior mutability: once [`SchemaRegistry::initialize`]
/// returns, it can be shared across threads and read without coordination.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    order: Vec<String>,
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Introspect `tables` from the backend.
    ///
    /// Fails with [`CatalogError::MissingTable`] if any table is absent from
    /// the data source.
    pub fn initialize<S: AsRef<str>>(
        backend: &dyn CatalogBackend,
        tables: &[S],
    ) -> Result<Self, CatalogError> {
        let available: HashSet<String> = backend.list_tables()?.into_iter().collect();

        let mut schemas = Vec::with_capacity(tables.len());
        for table in tables {
            let table = table.as_ref();
            if !available.contains(table) {
                return Err(CatalogError::MissingTable(table.to_string()));
            }
            let columns = backend.columns_of(table)?;
            tracing::info!(table, ?columns, "registered table");
            schemas.push(TableSchema::new(table, columns));
        }

        Ok(Self::from_schemas(schemas))
    }

    /// Build a registry from already known schemas. Later duplicates replace
    /// earlier ones but keep the first registration position.
    pub fn from_schemas(schemas: impl IntoIterator<Item = TableSchema>) -> Self {
        let mut registry = Self::default();
        for schema in schemas {
            if !registry.tables.contains_key(schema.name()) {
                registry.order.push(schema.name().to_string());
            }
            registry.tables.insert(schema.name().to_string(), schema);
        }
        registry
    }

    pub fn schema(&self, table: &str) -> Result<&TableSchema, CatalogError> {
        self.tables
            .get(table)
            .ok_or_else(|| CatalogError::UnknownTable(table.to_string()))
    }

    pub fn columns_of(&self, table: &str) -> Result<&[String], CatalogError> {
        self.schema(table).map(TableSchema::columns)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|schema| schema.has_column(column))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Registered table names in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
