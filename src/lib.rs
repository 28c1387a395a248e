// datalake2bq - Analytics data-lake exports into BigQuery
//
// One run lists the exports created since the window start, streams every
// Parquet file into the staging bucket, bulk-loads each schema type into its
// `{schemaType}_parquet` table, purges the staged files and deduplicates the
// tables that have a natural key.

mod init;
mod pipeline;

pub use init::{build_pipeline, init_tracing};
pub use pipeline::{default_window_start, PhaseCounts, Pipeline, RunSummary};
