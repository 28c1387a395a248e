//! Signed URL download into the staging bucket

use crate::error::TransferError;
use bytes::Bytes;
use datalake2bq_core::{is_path_segment, HttpClient, SchemaType, SignedTransfer, StagedObject};
use opendal::Operator;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Copies one export from its signed URL into `{schemaType}_parquet/`
#[derive(Clone)]
pub struct TransferWorker {
    http: Arc<dyn HttpClient>,
    operator: Operator,
}

impl TransferWorker {
    pub fn new(http: Arc<dyn HttpClient>, operator: Operator) -> Self {
        Self { http, operator }
    }

    /// Download, validate and stage a single export.
    ///
    /// The signed URL carries its own authorization, so no bearer token is sent.
    #[instrument(skip(self, transfer), fields(export_id = %transfer.id, schema_type = %schema_type))]
    pub async fn transfer(
        &self,
        transfer: &SignedTransfer,
        schema_type: &SchemaType,
    ) -> Result<StagedObject, TransferError> {
        let object_path = schema_type.object_path(&transfer.id);
        if !schema_type.is_path_safe() || !is_path_segment(&transfer.id) {
            return Err(TransferError::write(
                object_path,
                "export id or schema type is not a single path segment",
            ));
        }

        let response = self
            .http
            .get(&transfer.url, Vec::new())
            .await
            .map_err(|e| TransferError::fetch(&transfer.id, format!("{:#}", e)))?;

        if !response.is_success() {
            return Err(TransferError::status(&transfer.id, response.status));
        }

        let row_count = parquet_row_count(&response.body)
            .map_err(|reason| TransferError::invalid_payload(&transfer.id, reason))?;
        let size_bytes = response.body.len() as u64;

        self.operator
            .write(&object_path, response.body)
            .await
            .map_err(|e| TransferError::write(&object_path, e.to_string()))?;

        debug!(path = %object_path, size_bytes, row_count, "Staged export");

        Ok(StagedObject {
            schema_type: schema_type.clone(),
            object_path,
            size_bytes,
            row_count,
        })
    }
}

/// Read the Parquet footer and return the file's row count
pub fn parquet_row_count(body: &Bytes) -> Result<i64, String> {
    let reader = SerializedFileReader::new(body.clone()).map_err(|e| e.to_string())?;
    Ok(reader.metadata().file_metadata().num_rows())
}
