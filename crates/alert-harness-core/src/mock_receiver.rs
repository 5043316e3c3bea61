// crates/alert-harness-core/src/mock_receiver.rs
// ============================================================================
// Module: Mock Receiver Client
// Description: Stub programming and request-journal queries for the HTTP mock.
// Purpose: Serve canned responses and observe webhook deliveries.
// Dependencies: async-trait, base64, reqwest, serde, tokio
// ============================================================================

//! ## Overview
//! The mock receiver plays two roles: an upstream stand-in answering with
//! programmed stubs, and a webhook sink whose request journal the harness
//! inspects. [`MockReceiver`] is the seam the orchestrator depends on;
//! [`MockReceiverClient`] implements it against the mock's admin API.
//!
//! Invariants:
//! - Admin calls always use the runner-side (host) URL.
//! - [`MockReceiver::wait_for_requests`] never returns before its predicate
//!   holds or its deadline passes, and polls at least once per second.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tokio::time::Instant;
use tokio::time::sleep;
use tracing::debug;

use crate::error::HarnessError;
use crate::error::Result;
use crate::http::ApiClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest pause between journal polls.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: Stub Mappings
// ============================================================================

/// Canned response body.
#[derive(Debug, Clone, PartialEq)]
pub enum StubBody {
    /// JSON document.
    Json(Value),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// No body.
    Empty,
}

/// A request matcher paired with a canned response.
#[derive(Debug, Clone, PartialEq)]
pub struct StubMapping {
    /// HTTP method to match.
    pub method: String,
    /// Exact URL path to match.
    pub url_path: String,
    /// Request headers that must match exactly.
    pub headers: BTreeMap<String, String>,
    /// Response status.
    pub status: u16,
    /// Response body.
    pub body: StubBody,
    /// Survives a stub reset when true.
    pub persistent: bool,
}

impl StubMapping {
    /// Matches `method url_path` and answers `200 {}`.
    #[must_use]
    pub fn new(method: impl Into<String>, url_path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url_path: url_path.into(),
            headers: BTreeMap::new(),
            status: 200,
            body: StubBody::Json(json!({})),
            persistent: false,
        }
    }

    /// Requires a request header value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the response status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn with_body(mut self, body: StubBody) -> Self {
        self.body = body;
        self
    }

    /// Marks the mapping persistent.
    #[must_use]
    pub const fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Renders the admin API mapping document.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut request = json!({
            "method": self.method,
            "urlPath": self.url_path,
        });
        if !self.headers.is_empty() {
            let headers: serde_json::Map<String, Value> = self
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), json!({ "equalTo": value })))
                .collect();
            request["headers"] = Value::Object(headers);
        }
        let mut response = json!({ "status": self.status });
        match &self.body {
            StubBody::Json(value) => response["jsonBody"] = value.clone(),
            StubBody::Bytes(bytes) => response["base64Body"] = json!(STANDARD.encode(bytes)),
            StubBody::Empty => {}
        }
        json!({
            "request": request,
            "response": response,
            "persistent": self.persistent,
        })
    }
}

// ============================================================================
// SECTION: Recorded Requests
// ============================================================================

/// One request captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL path.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Base64-encoded request body.
    pub body_base64: String,
}

impl RecordedRequest {
    /// Decodes the body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] when the body is not valid base64.
    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.body_base64.as_bytes())
            .map_err(|err| HarnessError::Json(format!("invalid base64 body: {err}")))
    }

    /// Decodes the body as UTF-8 text with line breaks removed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] when the body is not base64 or UTF-8.
    pub fn body_text(&self) -> Result<String> {
        let bytes = self.body_bytes()?;
        let text = String::from_utf8(bytes)
            .map_err(|err| HarnessError::Json(format!("body is not utf-8: {err}")))?;
        Ok(text.replace(['\n', '\r'], ""))
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] when the body is not valid JSON.
    pub fn body_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body_text()?)?)
    }
}

/// Journal entry in either the wrapped or the flat admin layout.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JournalEntry {
    /// `{ "request": { ... } }`
    Wrapped {
        /// Captured request.
        request: RawRequest,
    },
    /// `{ ... }`
    Flat(RawRequest),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(default)]
    method: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, Value>,
    #[serde(default)]
    body_as_base64: String,
}

impl From<JournalEntry> for RecordedRequest {
    fn from(entry: JournalEntry) -> Self {
        let raw = match entry {
            JournalEntry::Wrapped {
                request,
            } => request,
            JournalEntry::Flat(raw) => raw,
        };
        let headers = raw
            .headers
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(text) => text,
                    Value::Array(values) => values
                        .iter()
                        .map(|value| {
                            value.as_str().map_or_else(|| value.to_string(), str::to_string)
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect();
        Self {
            method: raw.method,
            url: raw.url,
            headers,
            body_base64: raw.body_as_base64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    requests: Vec<JournalEntry>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

// ============================================================================
// SECTION: Receiver Seam
// ============================================================================

/// Predicate over the requests observed so far.
pub type RequestPredicate<'a> = &'a (dyn Fn(&[RecordedRequest]) -> bool + Send + Sync);

/// Programmable mock with a queryable request journal.
#[async_trait]
pub trait MockReceiver: Send + Sync {
    /// Registers request-matching stubs.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mock rejects a mapping.
    async fn install_stubs(&self, mappings: &[StubMapping]) -> Result<()>;

    /// Clears every recorded request.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mock is unreachable.
    async fn reset_journal(&self) -> Result<()>;

    /// Removes every non-persistent stub.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mock is unreachable.
    async fn reset_stubs(&self) -> Result<()>;

    /// Lists recorded requests matching `method url_path`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mock is unreachable or answers badly.
    async fn find_requests(&self, method: &str, url_path: &str) -> Result<Vec<RecordedRequest>>;

    /// Counts recorded requests matching `method url_path`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mock is unreachable or answers badly.
    async fn count_requests(&self, method: &str, url_path: &str) -> Result<u64>;

    /// Polls [`MockReceiver::find_requests`] until `predicate` holds or
    /// `deadline` passes; on timeout returns the last observed list.
    ///
    /// # Errors
    ///
    /// Returns the first [`HarnessError`] raised by a poll.
    async fn wait_for_requests(
        &self,
        method: &str,
        url_path: &str,
        predicate: RequestPredicate<'_>,
        deadline: Instant,
    ) -> Result<Vec<RecordedRequest>> {
        loop {
            let requests = self.find_requests(method, url_path).await?;
            if predicate(&requests) {
                return Ok(requests);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(requests);
            }
            sleep(MAX_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

/// Admin API client for the mock receiver.
#[derive(Debug, Clone)]
pub struct MockReceiverClient {
    /// Client bound to the runner-side base URL.
    api: ApiClient,
}

impl MockReceiverClient {
    /// Builds a client for the mock at `host_url`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the HTTP client cannot be built.
    pub fn new(host_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(host_url, timeout)?,
        })
    }

    /// Returns the runner-side base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }
}

#[async_trait]
impl MockReceiver for MockReceiverClient {
    async fn install_stubs(&self, mappings: &[StubMapping]) -> Result<()> {
        for mapping in mappings {
            self.api.send(Method::POST, "/__admin/mappings", Some(&mapping.to_wire())).await?;
            debug!(method = %mapping.method, path = %mapping.url_path, "stub installed");
        }
        Ok(())
    }

    async fn reset_journal(&self) -> Result<()> {
        self.api.send(Method::DELETE, "/__admin/requests", None).await.map(drop)
    }

    async fn reset_stubs(&self) -> Result<()> {
        self.api.send(Method::DELETE, "/__admin/mappings", None).await.map(drop)
    }

    async fn find_requests(&self, method: &str, url_path: &str) -> Result<Vec<RecordedRequest>> {
        let query = json!({ "method": method, "url": url_path });
        let response = self.api.send(Method::POST, "/__admin/requests/find", Some(&query)).await?;
        let parsed: FindResponse = response.json()?;
        Ok(parsed.requests.into_iter().map(RecordedRequest::from).collect())
    }

    async fn count_requests(&self, method: &str, url_path: &str) -> Result<u64> {
        let query = json!({ "method": method, "url": url_path });
        let response = self.api.send(Method::POST, "/__admin/requests/count", Some(&query)).await?;
        let parsed: CountResponse = response.json()?;
        Ok(parsed.count)
    }
}
