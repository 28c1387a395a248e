//! Access tokens for the BigQuery REST API

use crate::error::{Result, WarehouseError};
use datalake2bq_core::HttpClient;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

pub enum TokenProvider {
    /// Fixed token from configuration
    Static(String),
    /// Service-account token from the GCE metadata server, cached until near expiry
    Metadata {
        http: Arc<dyn HttpClient>,
        metadata_url: String,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

impl TokenProvider {
    pub fn from_config(
        access_token: Option<&str>,
        metadata_url: &str,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        match access_token.filter(|token| !token.trim().is_empty()) {
            Some(token) => Self::Static(token.to_string()),
            None => Self::Metadata {
                http,
                metadata_url: metadata_url.trim_end_matches('/').to_string(),
                cached: Mutex::new(None),
            },
        }
    }

    pub async fn token(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata {
                http,
                metadata_url,
                cached,
            } => {
                if let Some(token) = cached_token(cached) {
                    return Ok(token);
                }

                let fetched = fetch_metadata_token(http.as_ref(), metadata_url).await?;
                let valid_for =
                    Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
                if let Ok(mut slot) = cached.lock() {
                    *slot = Some((fetched.access_token.clone(), Instant::now() + valid_for));
                }
                debug!(expires_in = fetched.expires_in, "Fetched warehouse access token");
                Ok(fetched.access_token)
            }
        }
    }
}

fn cached_token(cached: &Mutex<Option<(String, Instant)>>) -> Option<String> {
    let slot = cached.lock().ok()?;
    match slot.as_ref() {
        Some((token, valid_until)) if Instant::now() < *valid_until => Some(token.clone()),
        _ => None,
    }
}

async fn fetch_metadata_token(http: &dyn HttpClient, metadata_url: &str) -> Result<MetadataToken> {
    let url = format!("{}{}", metadata_url, METADATA_TOKEN_PATH);
    let headers = vec![("Metadata-Flavor".to_string(), "Google".to_string())];

    let response = http
        .get(&url, headers)
        .await
        .map_err(|e| WarehouseError::token(format!("{:#}", e)))?;

    if !response.is_success() {
        return Err(WarehouseError::token(format!(
            "metadata server returned HTTP {}",
            response.status
        )));
    }

    let token: MetadataToken = response
        .json()
        .map_err(|e| WarehouseError::token(format!("{:#}", e)))?;
    if token.access_token.is_empty() {
        return Err(WarehouseError::token("metadata server returned an empty token"));
    }
    Ok(token)
}
