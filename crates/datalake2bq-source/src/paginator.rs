//! Lazy traversal of the metadata listing
//!
//! Each page is fetched only when the consumer polls for it, so memory stays
//! bounded by the current page plus the cursors and ids already seen. A page
//! that fails to load ends the listing; everything yielded before it stands.

use crate::client::{format_window_start, SourceClient, METADATA_PATH};
use crate::error::{Result, SourceError};
use chrono::{DateTime, Utc};
use datalake2bq_core::{ExportPage, MAX_BATCH_SIZE};
use futures::stream::{self, Stream};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

struct PageState {
    client: SourceClient,
    date_start: String,
    next_url: Option<String>,
    seen_cursors: HashSet<String>,
    seen_ids: HashSet<String>,
    page_index: usize,
}

/// Stream every metadata page created at or after `window_start`.
///
/// Ids already yielded on an earlier page are dropped, and a continuation
/// that points back at an already-visited page ends the stream.
pub fn list_pages(
    client: SourceClient,
    window_start: DateTime<Utc>,
) -> impl Stream<Item = ExportPage> + Send {
    let date_start = format_window_start(window_start);
    let first_url = first_page_url(client.api_base(), &date_start);

    let state = PageState {
        client,
        date_start,
        seen_cursors: first_url.iter().cloned().collect(),
        next_url: first_url,
        seen_ids: HashSet::new(),
        page_index: 0,
    };

    stream::unfold(state, |mut state| async move {
        let url = state.next_url.take()?;

        let mut page = match fetch_page(&state.client, &url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    page = state.page_index,
                    error = %e,
                    "Metadata page failed; ending listing"
                );
                return None;
            }
        };

        let listed = page.len();
        page.descriptors
            .retain(|descriptor| state.seen_ids.insert(descriptor.id.clone()));
        if page.len() < listed {
            debug!(
                page = state.page_index,
                dropped = listed - page.len(),
                "Dropped exports already listed on an earlier page"
            );
        }

        state.next_url = page.continuation().and_then(|uri| {
            match continuation_url(state.client.api_base(), uri, &state.date_start) {
                Ok(next) if state.seen_cursors.insert(next.clone()) => Some(next),
                Ok(next) => {
                    warn!(cursor = %next, "Continuation repeats a visited page; ending listing");
                    None
                }
                Err(e) => {
                    warn!(cursor = %uri, error = %e, "Unusable continuation; ending listing");
                    None
                }
            }
        });

        info!(
            page = state.page_index,
            exports = page.len(),
            has_next = state.next_url.is_some(),
            "Fetched metadata page"
        );
        state.page_index += 1;

        Some((page, state))
    })
}

async fn fetch_page(client: &SourceClient, url: &str) -> Result<ExportPage> {
    let response = client
        .http
        .get(url, client.auth_headers())
        .await
        .map_err(|e| SourceError::request(url, format!("{:#}", e)))?;

    if !response.is_success() {
        return Err(SourceError::request(
            url,
            format!("HTTP {}: {}", response.status, response.body_text()),
        ));
    }

    response
        .json::<ExportPage>()
        .map_err(|e| SourceError::request(url, format!("{:#}", e)))
}

fn first_page_url(api_base: &str, date_start: &str) -> Option<String> {
    match Url::parse(&format!("{}{}", api_base, METADATA_PATH)) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("dateStart", date_start)
                .append_pair("pageSize", &MAX_BATCH_SIZE.to_string());
            Some(url.into())
        }
        Err(e) => {
            warn!(api_base, error = %e, "Invalid API base URL; nothing to list");
            None
        }
    }
}

/// Resolve a host-relative `nextUri` against the API host, keeping the
/// listing window and page size when the cursor omits them.
pub(crate) fn continuation_url(
    api_base: &str,
    next_uri: &str,
    date_start: &str,
) -> std::result::Result<String, url::ParseError> {
    let base = Url::parse(api_base)?;
    let mut url = base.join(next_uri.trim())?;

    let (has_date_start, has_page_size) =
        url.query_pairs()
            .fold((false, false), |(date, size), (key, _)| {
                (date || key == "dateStart", size || key == "pageSize")
            });

    if !has_date_start || !has_page_size {
        let mut pairs = url.query_pairs_mut();
        if !has_date_start {
            pairs.append_pair("dateStart", date_start);
        }
        if !has_page_size {
            pairs.append_pair("pageSize", &MAX_BATCH_SIZE.to_string());
        }
    }

    Ok(url.into())
}
