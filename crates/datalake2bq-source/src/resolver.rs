//! Bulk signed-URL resolution

use crate::client::{SourceClient, BULK_PATH};
use crate::error::{Result, SourceError};
use datalake2bq_core::{http::json_content_type, SignedTransfer, MAX_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
struct BulkRequest<'a> {
    files: &'a [String],
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    entities: Vec<SignedTransfer>,
}

impl SourceClient {
    /// Resolve up to [`MAX_BATCH_SIZE`] export ids to signed download URLs in one request.
    ///
    /// Transport failures, non-success statuses and malformed bodies are logged
    /// and yield an empty resolution. Only oversize batches are an error. The
    /// result holds at most one transfer per id, in response order.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn resolve(&self, ids: &[String]) -> Result<Vec<SignedTransfer>> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(SourceError::batch_too_large(ids.len(), MAX_BATCH_SIZE));
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = format!("{}{}", self.api_base, BULK_PATH);
        let body = match serde_json::to_vec(&BulkRequest { files: ids }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode bulk request; skipping batch");
                return Ok(Vec::new());
            }
        };

        let mut headers = self.auth_headers();
        headers.push(json_content_type());

        let response = match self.http.post(&endpoint, headers, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Bulk resolve request failed; skipping batch");
                return Ok(Vec::new());
            }
        };

        if !response.is_success() {
            warn!(
                status = response.status,
                body = %response.body_text(),
                "Bulk resolve returned non-success status; skipping batch"
            );
            return Ok(Vec::new());
        }

        let parsed: BulkResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    error = %format!("{:#}", e),
                    "Malformed bulk resolve response; skipping batch"
                );
                return Ok(Vec::new());
            }
        };

        let transfers = first_per_id(ids, parsed.entities);
        debug!(resolved = transfers.len(), "Resolved signed URLs");
        Ok(transfers)
    }
}

/// Keep the first transfer for each id, in response order
fn first_per_id(ids: &[String], entities: Vec<SignedTransfer>) -> Vec<SignedTransfer> {
    let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(entities.len());

    entities
        .into_iter()
        .filter(|transfer| {
            if !requested.contains(transfer.id.as_str()) {
                debug!(id = %transfer.id, "Bulk response contained an id that was not requested");
            }
            seen.insert(transfer.id.clone())
        })
        .collect()
}
