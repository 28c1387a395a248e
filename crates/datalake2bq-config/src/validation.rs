// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_required(config)?;
    validate_source_config(&config.source)?;
    validate_storage_config(&config.storage)?;
    validate_warehouse_config(&config.warehouse)?;
    validate_pipeline_config(&config.pipeline)?;

    if config.http.timeout_secs == 0 {
        bail!("http.timeout_secs must be greater than 0");
    }

    Ok(())
}

/// Collect every missing required setting so one run reports them all
fn validate_required(config: &RuntimeConfig) -> Result<()> {
    let checks: [(&'static str, &str); 6] = [
        ("REGION", &config.source.region),
        ("CLIENT_ID", &config.source.client_id),
        ("SECRET", &config.source.client_secret),
        ("BUCKETNAME", &config.storage.bucket),
        ("PROJECTID", &config.warehouse.project_id),
        ("DATASETID", &config.warehouse.dataset_id),
    ];

    let missing: Vec<&'static str> = checks
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::missing(missing).into());
    }
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<()> {
    if config.region.contains("://") || config.region.contains('/') {
        return Err(ConfigError::invalid(
            "REGION",
            format!(
                "expected a bare domain such as mypurecloud.com, got '{}'",
                config.region
            ),
        )
        .into());
    }

    if config.lookback_hours == 0 {
        bail!("source.lookback_hours must be greater than 0");
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.bucket.contains('/') {
        return Err(ConfigError::invalid(
            "BUCKETNAME",
            "bucket name must not contain '/'",
        )
        .into());
    }

    if config.backend == StorageBackend::Fs {
        if let Some(ref fs) = config.fs {
            if fs.path.trim().is_empty() {
                bail!("storage.fs.path must not be empty");
            }
        }
    }

    Ok(())
}

fn validate_warehouse_config(config: &WarehouseConfig) -> Result<()> {
    for (setting, value) in [
        ("PROJECTID", &config.project_id),
        ("DATASETID", &config.dataset_id),
    ] {
        if value.contains('`') || value.contains(char::is_whitespace) {
            return Err(ConfigError::invalid(
                setting,
                format!("'{}' is not a valid identifier", value),
            )
            .into());
        }
    }

    if config.poll_interval_ms == 0 {
        bail!("warehouse.poll_interval_ms must be greater than 0");
    }

    if config.max_wait_secs == 0 {
        bail!("warehouse.max_wait_secs must be greater than 0");
    }

    if config.poll_interval_ms > config.max_wait_secs.saturating_mul(1_000) {
        warn!(
            poll_interval_ms = config.poll_interval_ms,
            max_wait_secs = config.max_wait_secs,
            "warehouse.poll_interval_ms exceeds max_wait_secs; jobs are polled at most once"
        );
    }

    Ok(())
}

fn validate_pipeline_config(config: &PipelineConfig) -> Result<()> {
    if config.page_concurrency == 0 {
        bail!("pipeline.page_concurrency must be greater than 0");
    }

    if config.transfer_concurrency == 0 {
        bail!("pipeline.transfer_concurrency must be greater than 0");
    }

    if config.phase_concurrency == 0 {
        bail!("pipeline.phase_concurrency must be greater than 0");
    }

    if config.dedup_window_rows == 0 {
        bail!("pipeline.dedup_window_rows must be greater than 0");
    }

    // Warn about fan-outs that tend to trip API rate limits
    if config.page_concurrency * config.transfer_concurrency > 1_024 {
        warn!(
            page_concurrency = config.page_concurrency,
            transfer_concurrency = config.transfer_concurrency,
            "pipeline fan-out is very large; signed URL downloads may be throttled"
        );
    }

    Ok(())
}
