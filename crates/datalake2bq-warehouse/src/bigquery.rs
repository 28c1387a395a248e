//! BigQuery REST v2 job client

use crate::error::{Result, WarehouseError};
use crate::identifier::TableRef;
use crate::job::{
    Job, JobConfiguration, JobInsert, JobReference, LoadConfiguration, QueryConfiguration,
    TableSchema,
};
use crate::schema::SchemaField;
use crate::token::TokenProvider;
use async_trait::async_trait;
use datalake2bq_config::WarehouseConfig;
use datalake2bq_core::http::{bearer, json_content_type};
use datalake2bq_core::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Bulk load of staged Parquet files into one table
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub table: TableRef,
    /// `gs://bucket/prefix/*.parquet`
    pub source_uri: String,
    pub schema: Option<&'static [SchemaField]>,
}

/// A job that reached DONE without errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: String,
    /// Rows written by a load job
    pub output_rows: Option<i64>,
    /// Rows changed by a DML statement
    pub affected_rows: Option<i64>,
}

/// Warehouse operations the pipeline needs; both block until the job finishes
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Append every matching Parquet file to the destination table
    async fn load_parquet(&self, request: &LoadRequest) -> Result<JobOutcome>;

    /// Run one standard-SQL statement against `table`
    async fn execute_query(&self, table: &TableRef, sql: &str) -> Result<JobOutcome>;
}

pub struct BigQueryClient {
    http: Arc<dyn HttpClient>,
    tokens: TokenProvider,
    base_url: String,
    project: String,
    location: Option<String>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl BigQueryClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &WarehouseConfig) -> Self {
        let tokens = TokenProvider::from_config(
            config.access_token.as_deref(),
            &config.metadata_url,
            http.clone(),
        );
        Self {
            http,
            tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project: config.project_id.clone(),
            location: config.location.clone(),
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }

    /// Fail early when no access token can be obtained
    pub async fn check_token(&self) -> Result<()> {
        self.tokens.token().await.map(|_| ())
    }

    fn jobs_url(&self) -> String {
        format!("{}/bigquery/v2/projects/{}/jobs", self.base_url, self.project)
    }

    fn job_reference(&self, kind: &str) -> JobReference {
        JobReference {
            project_id: self.project.clone(),
            job_id: format!("datalake2bq_{}_{}", kind, uuid::Uuid::new_v4().simple()),
            location: self.location.clone(),
        }
    }

    async fn headers(&self) -> Result<Vec<(String, String)>> {
        let token = self.tokens.token().await?;
        Ok(vec![bearer(&token), json_content_type()])
    }

    /// Insert a job and poll it until DONE
    async fn run_job(&self, table: &TableRef, insert: JobInsert<'_>) -> Result<JobOutcome> {
        let table_name = table.to_string();
        let body = serde_json::to_vec(&insert)
            .map_err(|e| WarehouseError::job_submit(&table_name, e.to_string()))?;

        let response = self
            .http
            .post(&self.jobs_url(), self.headers().await?, body)
            .await
            .map_err(|e| WarehouseError::job_submit(&table_name, format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(WarehouseError::job_submit(
                &table_name,
                format!("HTTP {}: {}", response.status, response.body_text()),
            ));
        }

        let mut job: Job = response
            .json()
            .map_err(|e| WarehouseError::job_submit(&table_name, format!("{:#}", e)))?;
        let job_id = job.job_reference.job_id.clone();
        debug!(job_id = %job_id, state = %job.status.state, "Job inserted");

        let started = Instant::now();
        while !job.is_done() {
            if started.elapsed() >= self.max_wait {
                return Err(WarehouseError::job_timeout(
                    &table_name,
                    &job_id,
                    started.elapsed().as_secs(),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
            job = self.get_job(&table_name, &job.job_reference).await?;
        }

        if let Some(reason) = job.failure() {
            return Err(WarehouseError::job_failed(&table_name, &job_id, reason));
        }

        Ok(JobOutcome {
            job_id,
            output_rows: job.output_rows(),
            affected_rows: job.affected_rows(),
        })
    }

    async fn get_job(&self, table_name: &str, reference: &JobReference) -> Result<Job> {
        let mut url = url::Url::parse(&format!("{}/{}", self.jobs_url(), reference.job_id))
            .map_err(|e| WarehouseError::job_submit(table_name, e.to_string()))?;
        if let Some(location) = reference.location.as_ref().or(self.location.as_ref()) {
            url.query_pairs_mut().append_pair("location", location);
        }

        let response = self
            .http
            .get(url.as_str(), self.headers().await?)
            .await
            .map_err(|e| WarehouseError::job_submit(table_name, format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(WarehouseError::job_submit(
                table_name,
                format!(
                    "polling job {} returned HTTP {}: {}",
                    reference.job_id,
                    response.status,
                    response.body_text()
                ),
            ));
        }

        response
            .json()
            .map_err(|e| WarehouseError::job_submit(table_name, format!("{:#}", e)))
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    #[instrument(skip(self, request), fields(table = %request.table))]
    async fn load_parquet(&self, request: &LoadRequest) -> Result<JobOutcome> {
        let insert = JobInsert {
            job_reference: self.job_reference("load"),
            configuration: JobConfiguration::Load(LoadConfiguration {
                source_uris: vec![request.source_uri.as_str()],
                source_format: "PARQUET",
                write_disposition: "WRITE_APPEND",
                destination_table: (&request.table).into(),
                schema: request.schema.map(|fields| TableSchema { fields }),
            }),
        };
        self.run_job(&request.table, insert).await
    }

    #[instrument(skip(self, sql), fields(table = %table))]
    async fn execute_query(&self, table: &TableRef, sql: &str) -> Result<JobOutcome> {
        let insert = JobInsert {
            job_reference: self.job_reference("query"),
            configuration: JobConfiguration::Query(QueryConfiguration {
                query: sql,
                use_legacy_sql: false,
            }),
        };
        self.run_job(table, insert).await
    }
}
