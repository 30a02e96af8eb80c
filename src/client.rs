//! Blocking HTTP client for the remote index API.
//!
//! Every operation goes through one bounded-retry helper: up to 3 attempts,
//! exponential backoff (1, 2, 4 units) after each failed attempt, and an
//! explicit [`Failure`] sentinel instead of a propagated error when the
//! remote stays unreachable. Callers pattern-match on the outcome; nothing
//! in this module panics or returns `Err` upward.
//!
//! Status triage per attempt:
//! - 2xx and 202 → done (202 means the remote queued the work; completion
//!   is not polled)
//! - 404 → done (a meaningful answer for existence checks and wipes)
//! - anything else → failed attempt, retried with backoff
//! - transport error (connect failure, timeout) → failed attempt, retried

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{Document, RemoteDocument};

/// Page size for remote document listing.
pub const PAGE_SIZE: usize = 1000;

/// Documents per upsert request.
pub const UPSERT_CHUNK_SIZE: usize = 1000;

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sentinel for a request that never completed: every attempt ended in a
/// transport failure. Means "remote state unknown", never "remote is empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure;

#[derive(Debug, Deserialize)]
struct DocumentsPage {
    #[serde(default)]
    results: Vec<RemoteDocument>,
}

pub struct IndexClient {
    http: Client,
    base_url: String,
    index_name: String,
    backoff_unit: Duration,
}

impl IndexClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            index_name: config.index_name.clone(),
            backoff_unit: Duration::from_secs(1),
        })
    }

    /// Override the backoff unit. Tests use milliseconds so the retry
    /// exhaustion paths run quickly.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Make sure the index exists, creating it when the existence check
    /// returns 404. Creation failure is logged and the run continues —
    /// later calls will surface their own errors.
    pub fn ensure_index(&self) {
        let url = format!("{}/indexes/{}", self.base_url, self.index_name);
        match self.send_with_retry("check index", || self.http.get(&url)) {
            Ok(resp) if resp.status().is_success() => {
                debug!(index = %self.index_name, "index exists");
            }
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => self.create_index(),
            Ok(resp) => {
                error!(index = %self.index_name, status = %resp.status(), "index check rejected");
            }
            Err(Failure) => {
                error!(index = %self.index_name, "index check unreachable");
            }
        }
    }

    fn create_index(&self) {
        let url = format!("{}/indexes", self.base_url);
        let body = serde_json::json!({ "uid": self.index_name });
        match self.send_with_retry("create index", || self.http.post(&url).json(&body)) {
            Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::ACCEPTED => {
                info!(index = %self.index_name, "created index");
            }
            Ok(resp) => {
                error!(index = %self.index_name, status = %resp.status(), "index creation rejected");
            }
            Err(Failure) => {
                error!(index = %self.index_name, "index creation unreachable");
            }
        }
    }

    /// Fetch the full remote document set, page by page.
    ///
    /// Returns [`Failure`] when any page cannot be retrieved — the caller
    /// must treat that as "remote state unknown", not as an empty index.
    pub fn fetch_all(&self) -> Result<Vec<RemoteDocument>, Failure> {
        let mut all = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{}/indexes/{}/documents?limit={}&offset={}",
                self.base_url, self.index_name, PAGE_SIZE, offset
            );
            let resp = self.send_with_retry("fetch documents", || self.http.get(&url))?;
            if !resp.status().is_success() {
                error!(
                    index = %self.index_name,
                    status = %resp.status(),
                    offset,
                    "document fetch rejected"
                );
                return Err(Failure);
            }

            let page: DocumentsPage = match resp.json() {
                Ok(page) => page,
                Err(err) => {
                    error!(index = %self.index_name, error = %err, "malformed documents page");
                    return Err(Failure);
                }
            };

            let count = page.results.len();
            all.extend(page.results);
            if count < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        debug!(index = %self.index_name, documents = all.len(), "fetched remote document set");
        Ok(all)
    }

    /// Delete the given ids in one batch request. No-op for an empty set.
    /// Returns whether the remote accepted the deletion.
    pub fn delete_batch(&self, ids: &BTreeSet<String>) -> bool {
        if ids.is_empty() {
            return true;
        }

        let url = format!(
            "{}/indexes/{}/documents/delete-batch",
            self.base_url, self.index_name
        );
        let body: Vec<&String> = ids.iter().collect();
        match self.send_with_retry("delete documents", || self.http.post(&url).json(&body)) {
            Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::ACCEPTED => {
                info!(index = %self.index_name, deleted = ids.len(), "deleted stale documents");
                true
            }
            Ok(resp) => {
                error!(index = %self.index_name, status = %resp.status(), "delete rejected");
                false
            }
            Err(Failure) => {
                error!(index = %self.index_name, "delete unreachable");
                false
            }
        }
    }

    /// Upsert documents in chunks of [`UPSERT_CHUNK_SIZE`], preserving
    /// order. A rejected or unreachable chunk does not stop the remaining
    /// chunks; the number of failed chunks is returned so the caller can
    /// report an aggregate.
    pub fn upsert_batch(&self, documents: &[Document]) -> usize {
        let url = format!("{}/indexes/{}/documents", self.base_url, self.index_name);
        let mut failed_chunks = 0;

        for chunk in documents.chunks(UPSERT_CHUNK_SIZE) {
            match self.send_with_retry("upsert documents", || self.http.post(&url).json(&chunk)) {
                Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::ACCEPTED => {
                    debug!(index = %self.index_name, documents = chunk.len(), "upserted chunk");
                }
                Ok(resp) => {
                    error!(
                        index = %self.index_name,
                        status = %resp.status(),
                        documents = chunk.len(),
                        "upsert chunk rejected"
                    );
                    failed_chunks += 1;
                }
                Err(Failure) => {
                    error!(
                        index = %self.index_name,
                        documents = chunk.len(),
                        "upsert chunk unreachable"
                    );
                    failed_chunks += 1;
                }
            }
        }

        if !documents.is_empty() && failed_chunks == 0 {
            info!(index = %self.index_name, documents = documents.len(), "upserted documents");
        }
        failed_chunks
    }

    /// Delete every document in the index. 404 (nothing there) counts as
    /// success. Returns whether the wipe took effect.
    pub fn wipe_all(&self) -> bool {
        let url = format!("{}/indexes/{}/documents", self.base_url, self.index_name);
        match self.send_with_retry("wipe documents", || self.http.delete(&url)) {
            Ok(resp)
                if resp.status().is_success()
                    || resp.status() == StatusCode::ACCEPTED
                    || resp.status() == StatusCode::NOT_FOUND =>
            {
                info!(index = %self.index_name, "wiped remote documents");
                true
            }
            Ok(resp) => {
                error!(index = %self.index_name, status = %resp.status(), "wipe rejected");
                false
            }
            Err(Failure) => {
                error!(index = %self.index_name, "wipe unreachable");
                false
            }
        }
    }

    /// Send one request with bounded retry.
    ///
    /// An attempt is terminal when the status is 2xx, 202, or 404; any
    /// other status and any transport error costs an attempt and sleeps
    /// `2^attempt` backoff units. After exhaustion the last rejected
    /// response is handed back for the caller to triage, or [`Failure`]
    /// when the remote never answered at all.
    fn send_with_retry(
        &self,
        action: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, Failure> {
        let mut last_rejected: Option<Response> = None;

        for attempt in 0..MAX_ATTEMPTS {
            match build().send() {
                Ok(resp) => {
                    let status = resp.status();
                    if acceptable(status) {
                        return Ok(resp);
                    }
                    warn!(action, %status, attempt, "request rejected");
                    last_rejected = Some(resp);
                }
                Err(err) => {
                    warn!(action, error = %err, attempt, "request failed");
                    last_rejected = None;
                }
            }
            std::thread::sleep(self.backoff_unit * 2u32.pow(attempt));
        }

        last_rejected.ok_or(Failure)
    }
}

/// Statuses that end the retry loop: success, queued (202), or a definite
/// "not there" (404) that callers interpret per operation.
fn acceptable(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::ACCEPTED || status == StatusCode::NOT_FOUND
}
