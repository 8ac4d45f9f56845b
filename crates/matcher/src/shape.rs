//! Response shaping for matched rows.

use catalog::{Row, ID_COLUMN};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;

/// Directory image references are rooted at unless configured otherwise.
pub const DEFAULT_DATA_ROOT: &str = "Data";
/// Name of the computed field appended to every record.
pub const IMAGE_FIELD: &str = "image";

/// Turns matched rows into the response body.
#[derive(Debug, Clone)]
pub struct ResultShaper {
    data_root: String,
}

impl Default for ResultShaper {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ROOT)
    }
}

impl ResultShaper {
    pub fn new(data_root: impl Into<String>) -> Self {
        let data_root: String = data_root.into();
        Self {
            data_root: data_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn data_root(&self) -> &str {
        &self.data_root
    }

    /// `<data_root>/<Table>/<id>.png`, with the first letter of the table
    /// upper-cased. Pure string work; the file is never touched.
    pub fn image_reference(&self, table: &str, id: &str) -> String {
        format!("{}/{}/{}.png", self.data_root, capitalize(table), id)
    }

    /// Key the records are listed under: the table name when it already ends
    /// in `s`, otherwise the name with `s` appended.
    pub fn collection_key(table: &str) -> String {
        if table.ends_with('s') {
            table.to_string()
        } else {
            format!("{table}s")
        }
    }

    /// Shape `rows` in the order given.
    pub fn shape(&self, table: &str, rows: Vec<Row>) -> ShapedResponse {
        let records = rows
            .into_iter()
            .map(|row| self.shape_row(table, row))
            .collect();
        ShapedResponse {
            key: Self::collection_key(table),
            records,
        }
    }

    fn shape_row(&self, table: &str, row: Row) -> ShapedRecord {
        // A row without an id still gets a reference, pointing at id 0.
        let id = row
            .get(ID_COLUMN)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .unwrap_or_else(|| "0".to_string());
        let image = self.image_reference(table, &id);

        let mut fields = Map::with_capacity(row.len());
        for (column, value) in row.iter() {
            if column == IMAGE_FIELD {
                continue;
            }
            fields.insert(column.to_string(), JsonValue::from(value.clone()));
        }

        ShapedRecord {
            fields,
            image: Some(image),
        }
    }
}

fn capitalize(table: &str) -> String {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One output record: the row's columns in schema order, then `image`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRecord {
    fields: Map<String, JsonValue>,
    image: Option<String>,
}

impl ShapedRecord {
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Filesystem path of the image reference, if any.
    pub fn image_path(&self) -> Option<PathBuf> {
        self.image.as_ref().map(PathBuf::from)
    }

    /// Replace the image reference with `null`.
    pub fn clear_image(&mut self) {
        self.image = None;
    }
}

impl Serialize for ShapedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(IMAGE_FIELD, &self.image)?;
        map.end()
    }
}

/// The full response body: `{ "<key>": [records...] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedResponse {
    key: String,
    records: Vec<ShapedRecord>,
}

impl ShapedResponse {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn records(&self) -> &[ShapedRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ShapedRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for ShapedResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.records)?;
        map.end()
    }
}
