// datalake2bq-warehouse - BigQuery load and deduplication
//
// Load jobs append each schema type's staged Parquet files to its
// `{schemaType}_parquet` table; deduplication deletes superseded rows from
// the most recent window of a table. Both run as BigQuery REST jobs that are
// polled to completion.

mod bigquery;
mod dedup;
mod error;
mod identifier;
mod job;
mod loader;
mod query;
mod rules;
mod schema;
mod token;

pub use bigquery::{BigQueryClient, JobOutcome, LoadRequest, Warehouse};
pub use dedup::DeduplicationJob;
pub use error::{Result, WarehouseError};
pub use identifier::{validate_project, Identifier, TableRef};
pub use job::{ErrorProto, Job, JobReference, JobStatus};
pub use loader::WarehouseLoader;
pub use query::{build_dedup_query, DedupQuery};
pub use rules::{rule_for, DedupRule, DEDUP_RULES};
pub use schema::{explicit_schema, FieldMode, FieldType, SchemaField, CONVERSATIONS_SCHEMA};
pub use token::TokenProvider;
