//! HTTP client abstraction
//!
//! The analytics API, signed download URLs, the GCE metadata server and the
//! BigQuery REST API are all reached through [`HttpClient`], so every remote
//! collaborator can be pointed at a mock server in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as text, lossily decoded (for diagnostics only)
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("Failed to parse JSON response body")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `Authorization: Bearer <token>` header pair
pub fn bearer(token: &str) -> (String, String) {
    ("Authorization".to_string(), format!("Bearer {}", token))
}

/// `Content-Type: application/json` header pair
pub fn json_content_type() -> (String, String) {
    ("Content-Type".to_string(), "application/json".to_string())
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse>;

    async fn get(&self, url: &str, headers: Vec<(String, String)>) -> Result<HttpResponse> {
        self.request("GET", url, headers, None).await
    }

    async fn post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        self.request("POST", url, headers, Some(body)).await
    }
}

/// reqwest-backed client shared by every remote collaborator
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("datalake2bq/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create reqwest client")?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(method.parse().context("Invalid HTTP method")?, url);

        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        if let Some(body_bytes) = body {
            builder = builder.body(body_bytes);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("HTTP {} request failed", method))?;

        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        tracing::trace!(method, status, bytes = body.len(), "HTTP response");

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse {
            status: 204,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::from_static(br#"{"ok": true}"#),
        };
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);

        let failed = HttpResponse {
            status: 503,
            headers: vec![],
            body: Bytes::new(),
        };
        assert!(!failed.is_success());
    }

    #[tokio::test]
    async fn test_reqwest_client_round_trip() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/echo")
                    .header("authorization", "Bearer t0ken")
                    .body("payload");
                then.status(201).body("created");
            })
            .await;

        let client = ReqwestHttpClient::new(Duration::from_secs(5)).unwrap();
        let response = client
            .post(
                &server.url("/echo"),
                vec![bearer("t0ken")],
                b"payload".to_vec(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.body_text(), "created");
    }
}
