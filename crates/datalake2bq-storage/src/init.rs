//! Storage operator initialization

use anyhow::{anyhow, Result};
use datalake2bq_config::{StorageBackend, StorageConfig};
use opendal::Operator;

/// Build the staging operator for the configured backend.
///
/// Object paths are bucket-relative (`{schemaType}_parquet/...`) for every backend.
pub fn build_operator(config: &StorageConfig) -> Result<Operator> {
    let operator = match config.backend {
        #[cfg(feature = "services-gcs")]
        StorageBackend::Gcs => {
            let mut gcs_builder = opendal::services::Gcs::default().bucket(&config.bucket);

            if let Some(endpoint) = &config.gcs.endpoint {
                gcs_builder = gcs_builder.endpoint(endpoint);
            }
            if let Some(path) = &config.gcs.credential_path {
                gcs_builder = gcs_builder.credential_path(path);
            }

            Operator::new(gcs_builder)
                .map_err(|e| anyhow!("Failed to create GCS operator: {}", e))?
                .finish()
        }
        #[cfg(feature = "services-fs")]
        StorageBackend::Fs => {
            let fs = config.fs.clone().unwrap_or_default();
            let fs_builder = opendal::services::Fs::default().root(&fs.path);
            Operator::new(fs_builder)
                .map_err(|e| anyhow!("Failed to create filesystem operator: {}", e))?
                .finish()
        }
        #[cfg(feature = "services-memory")]
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .map_err(|e| anyhow!("Failed to create memory operator: {}", e))?
            .finish(),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("Storage backend '{}' not compiled into this build", other),
    };

    tracing::debug!(
        backend = %config.backend,
        bucket = %config.bucket,
        "Storage operator initialized"
    );
    Ok(operator)
}
