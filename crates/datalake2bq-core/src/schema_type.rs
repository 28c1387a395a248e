//! Schema types and the staging/table names derived from them

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Category label of an export (e.g. `conversations`, `segments`).
///
/// The schema type decides both the staging prefix in object storage and the
/// destination warehouse table, which is what keeps concurrent workers of one
/// phase from ever touching the same path or table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaType(String);

impl SchemaType {
    /// Sentinel used when a signed transfer has no matching descriptor.
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn not_found() -> Self {
        Self(Self::NOT_FOUND.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.0 == Self::NOT_FOUND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Warehouse table name: `{schemaType}_parquet`
    pub fn table_name(&self) -> String {
        format!("{}_parquet", self.0)
    }

    /// Staging prefix, always ending with `/`: `{schemaType}_parquet/`
    pub fn staging_prefix(&self) -> String {
        format!("{}/", self.table_name())
    }

    /// Object path for one export: `{schemaType}_parquet/{id}_{schemaType}.parquet`
    pub fn object_path(&self, export_id: &str) -> String {
        format!("{}{}_{}.parquet", self.staging_prefix(), export_id, self.0)
    }

    /// Load source glob: `gs://{bucket}/{schemaType}_parquet/*.parquet`
    pub fn source_glob(&self, bucket: &str) -> String {
        format!("gs://{}/{}*.parquet", bucket, self.staging_prefix())
    }

    /// Whether the name can be used as a single path segment.
    ///
    /// Rejects separators and relative components so a schema type can never
    /// address an object outside its own prefix.
    pub fn is_path_safe(&self) -> bool {
        is_path_segment(&self.0)
    }
}

/// True when `value` is non-empty, not `.`/`..`, and contains no separators.
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.chars().any(char::is_control)
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SchemaType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Distinct schema types in first-seen order.
///
/// Each download unit returns one of these and the orchestrator merges them at
/// the phase join, so no shared accumulator is mutated concurrently.
#[derive(Debug, Clone, Default)]
pub struct SchemaTypeSet {
    order: Vec<SchemaType>,
    seen: HashSet<SchemaType>,
}

impl SchemaTypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema type; returns `false` if it was already present.
    pub fn insert(&mut self, schema_type: SchemaType) -> bool {
        if self.seen.contains(&schema_type) {
            return false;
        }
        self.seen.insert(schema_type.clone());
        self.order.push(schema_type);
        true
    }

    /// Append every type of `other` not already present, keeping first-seen order.
    pub fn merge(&mut self, other: SchemaTypeSet) {
        for schema_type in other.order {
            self.insert(schema_type);
        }
    }

    pub fn contains(&self, schema_type: &SchemaType) -> bool {
        self.seen.contains(schema_type)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaType> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[SchemaType] {
        &self.order
    }
}

impl PartialEq for SchemaTypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for SchemaTypeSet {}

impl FromIterator<SchemaType> for SchemaTypeSet {
    fn from_iter<I: IntoIterator<Item = SchemaType>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<SchemaType> for SchemaTypeSet {
    fn extend<I: IntoIterator<Item = SchemaType>>(&mut self, iter: I) {
        for schema_type in iter {
            self.insert(schema_type);
        }
    }
}

impl IntoIterator for SchemaTypeSet {
    type Item = SchemaType;
    type IntoIter = std::vec::IntoIter<SchemaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl<'a> IntoIterator for &'a SchemaTypeSet {
    type Item = &'a SchemaType;
    type IntoIter = std::slice::Iter<'a, SchemaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
