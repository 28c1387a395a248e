//! Post-load deduplication

use crate::bigquery::{JobOutcome, Warehouse};
use crate::error::Result;
use crate::query::build_dedup_query;
use crate::rules::{rule_for, DedupRule};
use datalake2bq_core::SchemaType;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Removes superseded rows from the most recent window of a table
#[derive(Clone)]
pub struct DeduplicationJob {
    warehouse: Arc<dyn Warehouse>,
    project: String,
    dataset: String,
    window_rows: u32,
}

impl DeduplicationJob {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        project: impl Into<String>,
        dataset: impl Into<String>,
        window_rows: u32,
    ) -> Self {
        Self {
            warehouse,
            project: project.into(),
            dataset: dataset.into(),
            window_rows,
        }
    }

    /// Rule for a schema type seen in this run, if its table is deduplicated
    pub fn rule_for(schema_type: &SchemaType) -> Option<&'static DedupRule> {
        rule_for(schema_type.as_str())
    }

    #[instrument(skip(self, rule), fields(schema_type = rule.schema_type))]
    pub async fn run(&self, rule: &'static DedupRule) -> Result<JobOutcome> {
        let query = build_dedup_query(&self.project, &self.dataset, rule, self.window_rows)?;
        debug!(sql = %query.sql, "Running deduplication");

        let outcome = self.warehouse.execute_query(&query.table, &query.sql).await?;
        info!(
            table = %query.table,
            job_id = %outcome.job_id,
            deleted_rows = ?outcome.affected_rows,
            "Deduplication completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigquery::LoadRequest;
    use crate::identifier::TableRef;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWarehouse {
        queries: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Warehouse for RecordingWarehouse {
        async fn load_parquet(&self, _request: &LoadRequest) -> Result<JobOutcome> {
            unreachable!("deduplication never loads")
        }

        async fn execute_query(&self, table: &TableRef, sql: &str) -> Result<JobOutcome> {
            self.queries
                .lock()
                .unwrap()
                .push((table.to_string(), sql.to_string()));
            Ok(JobOutcome {
                job_id: "q".to_string(),
                output_rows: None,
                affected_rows: Some(4),
            })
        }
    }

    #[test]
    fn test_only_mapped_types_have_rules() {
        assert!(DeduplicationJob::rule_for(&SchemaType::new("conversations")).is_some());
        assert!(DeduplicationJob::rule_for(&SchemaType::not_found()).is_none());
    }

    #[tokio::test]
    async fn test_run_sends_generated_statement() {
        let warehouse = Arc::new(RecordingWarehouse::default());
        let job = DeduplicationJob::new(warehouse.clone(), "proj", "ds", 250);
        let rule = DeduplicationJob::rule_for(&SchemaType::new("sessions")).unwrap();

        let outcome = job.run(rule).await.unwrap();
        assert_eq!(outcome.affected_rows, Some(4));

        let queries = warehouse.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, "proj.ds.sessions_parquet");
        assert!(queries[0].1.starts_with("DELETE FROM `proj.ds.sessions_parquet` AS t"));
        assert!(queries[0].1.contains("OFFSET 249"));
    }
}
