// Initialization utilities
//
// Logging/tracing setup and wiring of the pipeline's clients from RuntimeConfig

use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use datalake2bq_config::{LogConfig, LogFormat, RuntimeConfig};
use datalake2bq_core::{HttpClient, ReqwestHttpClient};
use datalake2bq_source::{Credentials, SourceClient};
use datalake2bq_storage::build_operator;
use datalake2bq_warehouse::{BigQueryClient, Warehouse};
use std::sync::Arc;
use tracing::info;

/// Initialize tracing/logging from the log settings
pub fn init_tracing(config: &LogConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Ignore the error when a subscriber is already installed
    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

/// Authenticate against every external system and assemble the pipeline.
///
/// Any error here is fatal for the run: nothing has been listed or staged yet.
pub async fn build_pipeline(config: &RuntimeConfig) -> Result<Pipeline> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.http.timeout())?);

    let api_base = config.source.api_base();
    let login_base = config.source.login_base();
    info!(api_base = %api_base, "Authenticating with the analytics API");
    let credentials = Credentials::new(
        config.source.client_id.as_str(),
        config.source.client_secret.as_str(),
    );
    let source = SourceClient::connect(http.clone(), &api_base, &login_base, &credentials)
        .await
        .context("Failed to authenticate with the analytics API")?;

    info!(
        backend = %config.storage.backend,
        bucket = %config.storage.bucket,
        "Initializing staging storage"
    );
    let operator = build_operator(&config.storage).context("Failed to initialize staging storage")?;

    let bigquery = BigQueryClient::new(http.clone(), &config.warehouse);
    bigquery
        .check_token()
        .await
        .context("Failed to obtain a warehouse access token")?;
    info!(
        project = %config.warehouse.project_id,
        dataset = %config.warehouse.dataset_id,
        "Warehouse client ready"
    );
    let warehouse: Arc<dyn Warehouse> = Arc::new(bigquery);

    Ok(Pipeline::new(config, source, http, operator, warehouse))
}
