use crate::auth::{self, AccessToken, Credentials};
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use datalake2bq_core::HttpClient;
use std::sync::Arc;

pub(crate) const METADATA_PATH: &str = "/api/v2/analytics/dataextraction/downloads/metadata";
pub(crate) const BULK_PATH: &str = "/api/v2/analytics/dataextraction/downloads/bulk";

/// Authenticated handle on the data-extraction endpoints
#[derive(Clone)]
pub struct SourceClient {
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) api_base: String,
    pub(crate) token: AccessToken,
}

impl SourceClient {
    /// Log in with client credentials; the token is reused for every call in the run
    pub async fn connect(
        http: Arc<dyn HttpClient>,
        api_base: &str,
        login_base: &str,
        credentials: &Credentials,
    ) -> Result<Self> {
        let token = auth::login(http.as_ref(), login_base, credentials).await?;
        Ok(Self::with_token(http, api_base, token))
    }

    pub fn with_token(http: Arc<dyn HttpClient>, api_base: &str, token: AccessToken) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub(crate) fn auth_headers(&self) -> Vec<(String, String)> {
        vec![self.token.authorization()]
    }
}

/// `dateStart` query value: UTC with millisecond precision and a `Z` suffix
pub fn format_window_start(window_start: DateTime<Utc>) -> String {
    window_start.to_rfc3339_opts(SecondsFormat::Millis, true)
}
