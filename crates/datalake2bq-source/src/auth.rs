//! OAuth2 client-credentials login

use crate::error::{Result, SourceError};
use base64::Engine;
use datalake2bq_core::HttpClient;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, instrument};

/// Client-credentials pair issued for the integration
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn basic_auth_header(&self) -> (String, String) {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        ("Authorization".to_string(), format!("Basic {}", encoded))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Bearer token returned by the login endpoint
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AccessToken {
    /// Header pair for authenticated API calls
    pub fn authorization(&self) -> (String, String) {
        datalake2bq_core::http::bearer(&self.access_token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchange client credentials for a bearer token.
///
/// Any failure here is fatal for the run.
#[instrument(skip(http, credentials), fields(client_id = %credentials.client_id))]
pub async fn login(
    http: &dyn HttpClient,
    login_base: &str,
    credentials: &Credentials,
) -> Result<AccessToken> {
    let endpoint = format!("{}/oauth/token", login_base.trim_end_matches('/'));

    let headers = vec![
        credentials.basic_auth_header(),
        (
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ),
    ];
    let body = b"grant_type=client_credentials".to_vec();

    let response = http
        .post(&endpoint, headers, body)
        .await
        .map_err(|e| SourceError::auth(&endpoint, e.to_string()))?;

    if !response.is_success() {
        return Err(SourceError::auth(
            &endpoint,
            format!("HTTP {}: {}", response.status, response.body_text()),
        ));
    }

    let token: AccessToken = response
        .json()
        .map_err(|e| SourceError::auth(&endpoint, format!("{:#}", e)))?;

    if token.access_token.is_empty() {
        return Err(SourceError::auth(&endpoint, "empty access_token in response"));
    }

    debug!(
        token_type = %token.token_type,
        expires_in = ?token.expires_in,
        "Obtained access token"
    );
    Ok(token)
}
