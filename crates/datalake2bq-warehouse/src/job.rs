//! BigQuery job resource, limited to the fields the pipeline reads and writes

use crate::identifier::TableRef;
use crate::schema::SchemaField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobInsert<'a> {
    pub job_reference: JobReference,
    pub configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum JobConfiguration<'a> {
    Load(LoadConfiguration<'a>),
    Query(QueryConfiguration<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoadConfiguration<'a> {
    pub source_uris: Vec<&'a str>,
    pub source_format: &'static str,
    pub write_disposition: &'static str,
    pub destination_table: TableReference<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryConfiguration<'a> {
    pub query: &'a str,
    pub use_legacy_sql: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableReference<'a> {
    pub project_id: &'a str,
    pub dataset_id: &'a str,
    pub table_id: &'a str,
}

impl<'a> From<&'a TableRef> for TableReference<'a> {
    fn from(table: &'a TableRef) -> Self {
        Self {
            project_id: table.project(),
            dataset_id: table.dataset().as_str(),
            table_id: table.table().as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TableSchema {
    pub fields: &'static [SchemaField],
}

/// Job resource as returned by insert and get
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_reference: JobReference,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub statistics: Option<JobStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error_result: Option<ErrorProto>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({}): {}", self.reason, location, self.message),
            None => write!(f, "{}: {}", self.reason, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatistics {
    #[serde(default)]
    pub load: Option<LoadStatistics>,
    #[serde(default)]
    pub query: Option<QueryStatistics>,
}

/// Counters arrive as decimal strings (int64 in JSON)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStatistics {
    #[serde(default)]
    pub output_rows: Option<String>,
    #[serde(default)]
    pub input_files: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    #[serde(default)]
    pub num_dml_affected_rows: Option<String>,
}

impl Job {
    pub fn is_done(&self) -> bool {
        self.status.state == "DONE"
    }

    /// Job-level error first, then any per-row errors
    pub fn failure(&self) -> Option<String> {
        if let Some(error) = &self.status.error_result {
            let mut reason = error.to_string();
            if !self.status.errors.is_empty() {
                reason.push_str(&format!(" ({} errors)", self.status.errors.len()));
            }
            return Some(reason);
        }
        if !self.status.errors.is_empty() {
            let messages: Vec<String> = self
                .status
                .errors
                .iter()
                .take(5)
                .map(ToString::to_string)
                .collect();
            return Some(messages.join("; "));
        }
        None
    }

    pub fn output_rows(&self) -> Option<i64> {
        self.statistics
            .as_ref()?
            .load
            .as_ref()?
            .output_rows
            .as_deref()?
            .parse()
            .ok()
    }

    pub fn affected_rows(&self) -> Option<i64> {
        self.statistics
            .as_ref()?
            .query
            .as_ref()?
            .num_dml_affected_rows
            .as_deref()?
            .parse()
            .ok()
    }
}
