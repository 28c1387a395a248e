use crate::{FsConfig, LogFormat, RuntimeConfig, StorageBackend};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "DATALAKE2BQ_";

/// Abstraction over environment-variable lookups so tests can supply a fixed map.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the DATALAKE2BQ_ prefix
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Required settings, bare or prefixed
    if let Some(region) = get_required_string(env, "REGION") {
        config.source.region = region;
    }
    if let Some(client_id) = get_required_string(env, "CLIENT_ID") {
        config.source.client_id = client_id;
    }
    if let Some(secret) = get_required_string(env, "SECRET") {
        config.source.client_secret = secret;
    }
    if let Some(bucket) = get_required_string(env, "BUCKETNAME") {
        config.storage.bucket = bucket;
    }
    if let Some(project) = get_required_string(env, "PROJECTID") {
        config.warehouse.project_id = project;
    }
    if let Some(dataset) = get_required_string(env, "DATASETID") {
        config.warehouse.dataset_id = dataset;
    }

    // Source API
    if let Some(url) = get_env_string(env, "API_BASE_URL") {
        config.source.api_base_url = Some(url);
    }
    if let Some(url) = get_env_string(env, "LOGIN_BASE_URL") {
        config.source.login_base_url = Some(url);
    }
    if let Some(hours) = get_env_u32(env, "LOOKBACK_HOURS")? {
        config.source.lookback_hours = hours;
    }

    // Storage backend
    if let Some(backend) = get_env_string(env, "STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid DATALAKE2BQ_STORAGE_BACKEND value")?;
    }
    if let Some(path) = get_env_string(env, "STORAGE_PATH") {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }
    if let Some(endpoint) = get_env_string(env, "GCS_ENDPOINT") {
        config.storage.gcs.endpoint = Some(endpoint);
    }
    if let Some(path) = get_env_string(env, "GCS_CREDENTIAL_PATH") {
        config.storage.gcs.credential_path = Some(path);
    }

    // Warehouse
    if let Some(url) = get_env_string(env, "BIGQUERY_BASE_URL") {
        config.warehouse.base_url = url;
    }
    if let Some(location) = get_env_string(env, "BIGQUERY_LOCATION") {
        config.warehouse.location = Some(location);
    }
    if let Some(token) = get_env_string(env, "BIGQUERY_ACCESS_TOKEN") {
        config.warehouse.access_token = Some(token);
    }
    if let Some(url) = get_env_string(env, "METADATA_URL") {
        config.warehouse.metadata_url = url;
    }
    if let Some(val) = get_env_u64(env, "POLL_INTERVAL_MS")? {
        config.warehouse.poll_interval_ms = val;
    }
    if let Some(val) = get_env_u64(env, "MAX_WAIT_SECS")? {
        config.warehouse.max_wait_secs = val;
    }

    // Pipeline fan-out
    if let Some(val) = get_env_usize(env, "PAGE_CONCURRENCY")? {
        config.pipeline.page_concurrency = val;
    }
    if let Some(val) = get_env_usize(env, "TRANSFER_CONCURRENCY")? {
        config.pipeline.transfer_concurrency = val;
    }
    if let Some(val) = get_env_usize(env, "PHASE_CONCURRENCY")? {
        config.pipeline.phase_concurrency = val;
    }
    if let Some(val) = get_env_u32(env, "DEDUP_WINDOW_ROWS")? {
        config.pipeline.dedup_window_rows = val;
    }

    if let Some(val) = get_env_u64(env, "HTTP_TIMEOUT_SECS")? {
        config.http.timeout_secs = val;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

/// Prefixed name wins over the bare name; blank values count as unset
fn get_required_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
        .or_else(|| env.get_raw(key))
        .filter(|val| !val.trim().is_empty())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_parsed<E, T>(env: &E, key: &str) -> Result<Option<T>>
where
    E: EnvSource,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    get_env_parsed(env, key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    get_env_parsed(env, key)
}

fn get_env_u32<E: EnvSource>(env: &E, key: &str) -> Result<Option<u32>> {
    get_env_parsed(env, key)
}
