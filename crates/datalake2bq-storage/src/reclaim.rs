//! Purge of staged objects after a successful load

use crate::error::ReclaimError;
use datalake2bq_core::SchemaType;
use opendal::{ErrorKind, Operator};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct StagingReclaimer {
    operator: Operator,
}

impl StagingReclaimer {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Delete every object under `{schemaType}_parquet/`, returning how many were removed.
    ///
    /// A missing or empty prefix is not an error. The first failed delete stops
    /// the purge; objects already deleted stay deleted.
    #[instrument(skip(self), fields(schema_type = %schema_type))]
    pub async fn purge(&self, schema_type: &SchemaType) -> Result<usize, ReclaimError> {
        let prefix = schema_type.staging_prefix();
        if !schema_type.is_path_safe() {
            return Err(ReclaimError::list(prefix, "schema type is not a single path segment"));
        }

        let entries = match self.operator.list_with(&prefix).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(prefix = %prefix, "Staging prefix does not exist");
                return Ok(0);
            }
            Err(e) => return Err(ReclaimError::list(&prefix, e.to_string())),
        };

        let mut deleted = 0usize;
        for entry in entries {
            if entry.metadata().is_dir() {
                continue;
            }
            self.operator
                .delete(entry.path())
                .await
                .map_err(|e| ReclaimError::delete(entry.path(), deleted, e.to_string()))?;
            deleted += 1;
        }

        debug!(prefix = %prefix, deleted, "Purged staging prefix");
        Ok(deleted)
    }
}
