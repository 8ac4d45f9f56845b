use crate::{CatalogError, Row, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Trait for a read-only table source.
/// This allows for different storage implementations (e.g., in-memory, SQLite).
pub trait CatalogBackend: Send + Sync {
    /// Names of every table the source knows about.
    fn list_tables(&self) -> Result<Vec<String>, CatalogError>;
    /// Ordered column names of `table`.
    fn columns_of(&self, table: &str) -> Result<Vec<String>, CatalogError>;
    /// Visit every row of `table` in a stable order.
    ///
    /// Rows that fail to decode are handed to the visitor as `Err` so the
    /// caller can skip them; only source-wide failures abort the scan.
    fn scan(
        &self,
        table: &str,
        visitor: &mut dyn FnMut(Result<Row, CatalogError>),
    ) -> Result<(), CatalogError>;
    /// Fetch the single row whose `id` equals `id`.
    ///
    /// Fails with [`CatalogError::DuplicateId`] when the identifier is shared
    /// by several rows.
    fn fetch_by_id(&self, table: &str, id: i64) -> Result<Option<Row>, CatalogError>;
    /// Short label used in logs.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use catalog::BackendConfig;
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // SQLite queried per request
/// let config = BackendConfig::sqlite("Data/dom6api.db");
///
/// // SQLite copied into memory once at startup
/// let config = BackendConfig::sqlite_snapshot("Data/dom6api.db");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// An empty in-memory backend. Useful only for tests that register no tables.
    #[default]
    InMemory,
    /// A read-only SQLite connection queried on every request.
    ///
    /// Requires the `backend-sqlite` feature (enabled by default).
    Sqlite {
        path: PathBuf,
        create_if_missing: bool,
    },
    /// Copy every configured table out of SQLite into an immutable
    /// [`InMemoryBackend`] at startup.
    SqliteSnapshot {
        path: PathBuf,
        create_if_missing: bool,
    },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn sqlite<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::Sqlite {
            path: path.into(),
            create_if_missing: false,
        }
    }

    pub fn sqlite_snapshot<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::SqliteSnapshot {
            path: path.into(),
            create_if_missing: false,
        }
    }

    /// Create the database with empty `(id, name)` tables when the file is absent.
    pub fn with_create_if_missing(mut self, enabled: bool) -> Self {
        match &mut self {
            BackendConfig::InMemory => {}
            BackendConfig::Sqlite {
                create_if_missing, ..
            }
            | BackendConfig::SqliteSnapshot {
                create_if_missing, ..
            } => *create_if_missing = enabled,
        }
        self
    }

    /// Build the backend. `tables` is the set of tables the service will
    /// register; snapshot backends copy exactly these.
    pub fn build(&self, tables: &[String]) -> Result<Arc<dyn CatalogBackend>, CatalogError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryBackend::new())),
            BackendConfig::Sqlite {
                path,
                create_if_missing,
            } => {
                #[cfg(feature = "backend-sqlite")]
                {
                    Ok(Arc::new(open_sqlite(path, *create_if_missing, tables)?))
                }
                #[cfg(not(feature = "backend-sqlite"))]
                {
                    let _ = (path, create_if_missing, tables);
                    Err(CatalogError::backend(
                        "sqlite backend disabled at compile time",
                    ))
                }
            }
            BackendConfig::SqliteSnapshot {
                path,
                create_if_missing,
            } => {
                #[cfg(feature = "backend-sqlite")]
                {
                    let source = open_sqlite(path, *create_if_missing, tables)?;
                    Ok(Arc::new(InMemoryBackend::snapshot(&source, tables)?))
                }
                #[cfg(not(feature = "backend-sqlite"))]
                {
                    let _ = (path, create_if_missing, tables);
                    Err(CatalogError::backend(
                        "sqlite backend disabled at compile time",
                    ))
                }
            }
        }
    }
}

#[cfg(feature = "backend-sqlite")]
fn open_sqlite(
    path: &std::path::Path,
    create_if_missing: bool,
    tables: &[String],
) -> Result<SqliteBackend, CatalogError> {
    if create_if_missing {
        SqliteBackend::open_or_create(path, tables)
    } else {
        SqliteBackend::open(path)
    }
}

#[derive(Debug)]
struct MemoryTable {
    columns: Arc<[String]>,
    rows: Vec<Row>,
    by_id: HashMap<i64, IdSlot>,
}

#[derive(Debug, Clone, Copy)]
enum IdSlot {
    Unique(usize),
    Shared,
}

/// An immutable in-memory backend.
///
/// Tables are added through the `&mut self` builder methods before the
/// backend is shared; afterwards it is only read, so no lock is involved.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    order: Vec<String>,
    tables: HashMap<String, MemoryTable>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table. Every row must have one value per column.
    pub fn insert_table(
        &mut self,
        name: &str,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<(), CatalogError> {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(name, Arc::clone(&columns), values))
            .collect::<Result<Vec<_>, _>>()?;
        self.insert_rows(name, columns, rows);
        Ok(())
    }

    /// Builder-style variant of [`InMemoryBackend::insert_table`].
    pub fn with_table(
        mut self,
        name: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, CatalogError> {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.insert_table(name, columns, rows)?;
        Ok(self)
    }

    fn insert_rows(&mut self, name: &str, columns: Arc<[String]>, rows: Vec<Row>) {
        let mut by_id = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if let Some(id) = row.identifier() {
                by_id
                    .entry(id)
                    .and_modify(|slot| *slot = IdSlot::Shared)
                    .or_insert(IdSlot::Unique(idx));
            }
        }
        if !self.tables.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns,
                rows,
                by_id,
            },
        );
    }

    /// Copy `tables` out of another backend.
    ///
    /// Rows the source cannot decode are logged and left out of the snapshot.
    pub fn snapshot<S: AsRef<str>>(
        source: &dyn CatalogBackend,
        tables: &[S],
    ) -> Result<Self, CatalogError> {
        let mut backend = Self::new();
        for table in tables {
            let table = table.as_ref();
            tracing::info!(table, source = source.kind(), "copying table into memory");
            let columns: Arc<[String]> = source.columns_of(table)?.into();
            let mut rows = Vec::new();
            let mut skipped = 0usize;
            source.scan(table, &mut |row| match row {
                Ok(row) => rows.push(row),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(table, error = %err, "skipping undecodable row");
                }
            })?;
            tracing::info!(table, rows = rows.len(), skipped, "table copied");
            backend.insert_rows(table, columns, rows);
        }
        Ok(backend)
    }

    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }

    fn table(&self, table: &str) -> Result<&MemoryTable, CatalogError> {
        self.tables
            .get(table)
            .ok_or_else(|| CatalogError::MissingTable(table.to_string()))
    }
}

impl CatalogBackend for InMemoryBackend {
    fn list_tables(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.order.clone())
    }

    fn columns_of(&self, table: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self.table(table)?.columns.to_vec())
    }

    fn scan(
        &self,
        table: &str,
        visitor: &mut dyn FnMut(Result<Row, CatalogError>),
    ) -> Result<(), CatalogError> {
        for row in &self.table(table)?.rows {
            visitor(Ok(row.clone()));
        }
        Ok(())
    }

    fn fetch_by_id(&self, table: &str, id: i64) -> Result<Option<Row>, CatalogError> {
        let name = table;
        let table = self.table(table)?;
        match table.by_id.get(&id) {
            Some(IdSlot::Unique(idx)) => Ok(table.rows.get(*idx).cloned()),
            Some(IdSlot::Shared) => Err(CatalogError::DuplicateId {
                table: name.to_string(),
                id,
            }),
            None => Ok(None),
        }
    }

    fn kind(&self) -> &'static str {
        "in_memory"
    }
}

/// The SQLite backend implementation.
#[cfg(feature = "backend-sqlite")]
pub mod sqlite;

#[cfg(feature = "backend-sqlite")]
pub use sqlite::SqliteBackend;
