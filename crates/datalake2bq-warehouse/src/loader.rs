//! Per-schema-type bulk load

use crate::bigquery::{JobOutcome, LoadRequest, Warehouse};
use crate::error::Result;
use crate::identifier::TableRef;
use crate::schema::explicit_schema;
use datalake2bq_core::SchemaType;
use std::sync::Arc;
use tracing::{info, instrument};

/// Appends `gs://{bucket}/{schemaType}_parquet/*.parquet` to `{schemaType}_parquet`
#[derive(Clone)]
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
    project: String,
    dataset: String,
    bucket: String,
}

impl WarehouseLoader {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        project: impl Into<String>,
        dataset: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            project: project.into(),
            dataset: dataset.into(),
            bucket: bucket.into(),
        }
    }

    /// Build the load request for a schema type; identifiers are validated here
    pub fn request_for(&self, schema_type: &SchemaType) -> Result<LoadRequest> {
        Ok(LoadRequest {
            table: TableRef::new(&self.project, &self.dataset, &schema_type.table_name())?,
            source_uri: schema_type.source_glob(&self.bucket),
            schema: explicit_schema(schema_type.as_str()),
        })
    }

    #[instrument(skip(self), fields(schema_type = %schema_type))]
    pub async fn load(&self, schema_type: &SchemaType) -> Result<JobOutcome> {
        let request = self.request_for(schema_type)?;
        let outcome = self.warehouse.load_parquet(&request).await?;
        info!(
            table = %request.table,
            job_id = %outcome.job_id,
            output_rows = ?outcome.output_rows,
            "Load job completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarehouseError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWarehouse {
        loads: Mutex<Vec<LoadRequest>>,
    }

    #[async_trait]
    impl Warehouse for RecordingWarehouse {
        async fn load_parquet(&self, request: &LoadRequest) -> Result<JobOutcome> {
            self.loads.lock().unwrap().push(request.clone());
            Ok(JobOutcome {
                job_id: "job".to_string(),
                output_rows: Some(1),
                affected_rows: None,
            })
        }

        async fn execute_query(&self, _table: &TableRef, _sql: &str) -> Result<JobOutcome> {
            unreachable!("loader never runs queries")
        }
    }

    #[tokio::test]
    async fn test_load_targets_table_and_glob() {
        let warehouse = Arc::new(RecordingWarehouse::default());
        let loader = WarehouseLoader::new(warehouse.clone(), "proj", "ds", "staging");

        loader.load(&SchemaType::new("segments")).await.unwrap();
        loader.load(&SchemaType::new("conversations")).await.unwrap();

        let loads = warehouse.loads.lock().unwrap();
        assert_eq!(loads[0].table.to_string(), "proj.ds.segments_parquet");
        assert_eq!(loads[0].source_uri, "gs://staging/segments_parquet/*.parquet");
        assert!(loads[0].schema.is_none());
        assert_eq!(loads[1].schema.map(<[_]>::len), Some(17));
    }

    #[tokio::test]
    async fn test_invalid_schema_type_never_reaches_warehouse() {
        let warehouse = Arc::new(RecordingWarehouse::default());
        let loader = WarehouseLoader::new(warehouse.clone(), "proj", "ds", "staging");

        let err = loader
            .load(&SchemaType::new("bad-name"))
            .await
            .unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidIdentifier { .. }));
        assert!(warehouse.loads.lock().unwrap().is_empty());
    }
}
