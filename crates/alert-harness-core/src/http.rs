// crates/alert-harness-core/src/http.rs
// ============================================================================
// Module: HTTP Client
// Description: Timeout-bounded JSON client shared by the harness API clients.
// Purpose: Classify transport and status failures in one place.
// Dependencies: reqwest, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A response whose status has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Full request URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response text.
    pub body: String,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Fails unless the status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns a transient error for 5xx and a protocol error otherwise.
    pub fn success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(HarnessError::from_status(&self.url, self.status, self.body))
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a protocol error naming the endpoint when decoding fails.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            HarnessError::bad_body(&self.url, self.status, &err.to_string(), &self.body)
        })
    }
}

/// JSON client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL without trailing slash.
    base_url: String,
    /// Bearer token attached to every request.
    token: Option<String>,
    /// Underlying client with a per-call timeout.
    client: Client,
}

impl ApiClient {
    /// Builds a client for `base_url` with a per-call `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                HarnessError::SetupFatal(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    /// Attaches `Authorization: Bearer <token>` to every request.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request without checking the status.
    ///
    /// # Errors
    ///
    /// Returns a transient error when the request cannot be completed.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|err| HarnessError::transport(&url, &err))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| HarnessError::transport(&url, &err))?;
        Ok(RawResponse {
            url,
            status,
            body,
        })
    }

    /// Sends a request and requires a 2xx status.
    ///
    /// # Errors
    ///
    /// Returns a transient or protocol error on failure.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        self.send_raw(method, path, &[], body).await?.success()
    }
}
