use crate::backend::CatalogBackend;
use crate::{CatalogError, Row, Value, ID_COLUMN};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Read-only SQLite source.
///
/// A single connection is shared behind a mutex; every call runs its own
/// statement, so the dataset is re-read on each request.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open an existing database read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::info!(path = %path.display(), "opened sqlite catalog");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open `path`, first creating it with empty `(id, name)` tables for
    /// every entry of `tables` when the file does not exist yet.
    pub fn open_or_create<P: AsRef<Path>, S: AsRef<str>>(
        path: P,
        tables: &[S],
    ) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::warn!(path = %path.display(), "database missing, creating empty tables");
            let conn = Connection::open(path)?;
            for table in tables {
                let table = quote_ident(table.as_ref())?;
                conn.execute(
                    &format!("CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY, name TEXT)"),
                    [],
                )?;
            }
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| CatalogError::backend("poisoned lock"))?;
        f(&guard)
    }
}

/// Quote a table name for interpolation, accepting only `[A-Za-z0-9_]`.
fn quote_ident(name: &str) -> Result<String, CatalogError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CatalogError::InvalidTableName(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Arc<[String]> {
    stmt.column_names().into_iter().map(String::from).collect()
}

fn decode_row(
    table: &str,
    columns: &Arc<[String]>,
    row: &rusqlite::Row<'_>,
) -> Result<Row, CatalogError> {
    let decode_err = |reason: String| CatalogError::Decode {
        table: table.to_string(),
        reason,
    };

    let mut values = Vec::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        let value = match row.get_ref(idx).map_err(|e| decode_err(e.to_string()))? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Float(v),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Value::Text(s.to_string()),
                Err(e) => return Err(decode_err(format!("column '{column}': {e}"))),
            },
            // Blobs are surfaced as lossy text.
            ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        };
        values.push(value);
    }
    Row::new(table, Arc::clone(columns), values)
}

impl CatalogBackend for SqliteBackend {
    fn list_tables(&self) -> Result<Vec<String>, CatalogError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    fn columns_of(&self, table: &str) -> Result<Vec<String>, CatalogError> {
        let quoted = quote_ident(table)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({quoted})"))?;
            let columns = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>, _>>()?;
            if columns.is_empty() {
                return Err(CatalogError::MissingTable(table.to_string()));
            }
            Ok(columns)
        })
    }

    fn scan(
        &self,
        table: &str,
        visitor: &mut dyn FnMut(Result<Row, CatalogError>),
    ) -> Result<(), CatalogError> {
        let quoted = quote_ident(table)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT * FROM {quoted}"))?;
            let columns = column_names(&stmt);
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                visitor(decode_row(table, &columns, row));
            }
            Ok(())
        })
    }

    fn fetch_by_id(&self, table: &str, id: i64) -> Result<Option<Row>, CatalogError> {
        let quoted = quote_ident(table)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT * FROM {quoted} WHERE {ID_COLUMN} = ?1 LIMIT 2"
            ))?;
            let columns = column_names(&stmt);
            let mut rows = stmt.query(params![id])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let first = decode_row(table, &columns, row);
            if rows.next()?.is_some() {
                return Err(CatalogError::DuplicateId {
                    table: table.to_string(),
                    id,
                });
            }
            first.map(Some)
        })
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }
}
