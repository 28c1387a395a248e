// datalake2bq-config - Runtime configuration for the export pipeline
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority; required settings accept the
//    bare name, e.g. REGION, or the DATALAKE2BQ_ prefixed name)
// 2. Config file path from DATALAKE2BQ_CONFIG env var
// 3. Config file contents from DATALAKE2BQ_CONFIG_CONTENT env var
// 4. Default config file location (./datalake2bq.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

mod env_overrides;
mod error;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
pub use error::ConfigError;
pub use sources::{load_from_env_source, StdEnvSource};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Analytics API connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API region domain, e.g. `mypurecloud.com`
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Overrides `https://api.{region}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Overrides `https://login.{region}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_base_url: Option<String>,
    /// Listing window reaches this far back from the run start
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

fn default_lookback_hours() -> u32 {
    24
}

impl SourceConfig {
    pub fn api_base(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://api.{}", self.region))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn login_base(&self) -> String {
        self.login_base_url
            .clone()
            .unwrap_or_else(|| format!("https://login.{}", self.region))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(u64::from(self.lookback_hours) * 3600)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            api_base_url: None,
            login_base_url: None,
            lookback_hours: default_lookback_hours(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("region", &self.region)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact_secret(&self.client_secret))
            .field("api_base_url", &self.api_base_url)
            .field("login_base_url", &self.login_base_url)
            .field("lookback_hours", &self.lookback_hours)
            .finish()
    }
}

/// Staging object store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Bucket name; also used to build `gs://` load globs
    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub gcs: GcsConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Gcs,
    Fs,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Gcs => write!(f, "gcs"),
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gcs" | "gs" | "google" => Ok(StorageBackend::Gcs),
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => anyhow::bail!(
                "Unsupported storage backend: {}. Supported: gcs, fs, memory",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Service account key file; falls back to the ambient credential loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./staging".to_string(),
        }
    }
}

/// BigQuery settings
#[derive(Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: String,
    /// Job location (e.g. `EU`); BigQuery infers it when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_bigquery_base_url")]
    pub base_url: String,
    /// Static access token; when unset one is fetched from the metadata server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_bigquery_base_url() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_metadata_url() -> String {
    "http://metadata.google.internal".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_wait_secs() -> u64 {
    3_600
}

impl WarehouseConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset_id: String::new(),
            location: None,
            base_url: default_bigquery_base_url(),
            access_token: None,
            metadata_url: default_metadata_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("project_id", &self.project_id)
            .field("dataset_id", &self.dataset_id)
            .field("location", &self.location)
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_deref().map(redact_secret),
            )
            .field("metadata_url", &self.metadata_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_wait_secs", &self.max_wait_secs)
            .finish()
    }
}

/// Fan-out bounds for each phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Metadata pages resolved and transferred at the same time
    pub page_concurrency: usize,
    /// Transfers in flight per page
    pub transfer_concurrency: usize,
    /// Loads, purges or dedup jobs in flight per phase
    pub phase_concurrency: usize,
    /// Size of the recency window scanned by deduplication
    pub dedup_window_rows: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_concurrency: 4,
            transfer_concurrency: 32,
            phase_concurrency: 8,
            dedup_window_rows: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration starting from an explicit file (for the `--config` flag)
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

/// Keep the first and last two characters of a secret for debugging auth issues
pub fn redact_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 6 {
        return "***".to_string();
    }
    let head: String = secret.chars().take(2).collect();
    let tail: String = secret.chars().skip(len - 2).collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("gcs".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!("GS".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!(
            "filesystem".parse::<StorageBackend>().unwrap(),
            StorageBackend::Fs
        );
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.dedup_window_rows, 5_000);
        assert!(pipeline.page_concurrency > 0);

        let warehouse = WarehouseConfig::default();
        assert_eq!(warehouse.base_url, "https://bigquery.googleapis.com");
        assert_eq!(warehouse.poll_interval(), Duration::from_secs(1));

        let source = SourceConfig::default();
        assert_eq!(source.lookback(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_region_derived_urls() {
        let source = SourceConfig {
            region: "mypurecloud.ie".to_string(),
            ..Default::default()
        };
        assert_eq!(source.api_base(), "https://api.mypurecloud.ie");
        assert_eq!(source.login_base(), "https://login.mypurecloud.ie");

        let overridden = SourceConfig {
            api_base_url: Some("http://127.0.0.1:8080/".to_string()),
            ..source
        };
        assert_eq!(overridden.api_base(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let source = SourceConfig {
            client_secret: "super-secret-value".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("su***ue"));
        assert_eq!(redact_secret("abc"), "***");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [source]
            region = "mypurecloud.com"

            [pipeline]
            page_concurrency = 2
            transfer_concurrency = 16
            phase_concurrency = 4
            dedup_window_rows = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.source.region, "mypurecloud.com");
        assert_eq!(config.source.lookback_hours, 24);
        assert_eq!(config.pipeline.dedup_window_rows, 1000);
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.log.format, LogFormat::Text);
    }
}
