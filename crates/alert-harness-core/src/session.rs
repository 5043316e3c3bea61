// crates/alert-harness-core/src/session.rs
// ============================================================================
// Module: Admin Session
// Description: First-user registration and password login against the SUT.
// Purpose: Obtain the bearer token the control plane client needs.
// Dependencies: reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! Login is two calls: resolve the organization for the email through the
//! session context endpoint, then exchange email, password, and org id for
//! an access token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::HarnessError;
use crate::error::Result;
use crate::http::ApiClient;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SessionContext {
    #[serde(default)]
    orgs: Vec<OrgRef>,
}

#[derive(Debug, Deserialize)]
struct OrgRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenGrant {
    access_token: String,
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// An authenticated admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    /// Organization the admin belongs to.
    pub org_id: String,
    /// Bearer token.
    pub access_token: String,
}

impl AdminSession {
    /// Logs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the org lookup or the login fails.
    pub async fn login(
        sut_url: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api = ApiClient::new(sut_url, timeout)?;
        let context = api
            .send_raw(
                Method::GET,
                "/api/v2/sessions/context",
                &[("email", email), ("ref", api.base_url())],
                None,
            )
            .await?
            .success()?;
        let envelope: Envelope<SessionContext> = context.json()?;
        let org_id = envelope.data.orgs.into_iter().next().map(|org| org.id).ok_or_else(|| {
            HarnessError::bad_body(&context.url, context.status, "no organization", &context.body)
        })?;

        let body = json!({ "email": email, "password": password, "orgId": org_id });
        let grant = api.send(Method::POST, "/api/v2/sessions/email_password", Some(&body)).await?;
        let envelope: Envelope<TokenGrant> = grant.json()?;
        info!(org_id = %org_id, "admin session established");
        Ok(Self {
            org_id,
            access_token: envelope.data.access_token,
        })
    }

    /// Registers the first admin user; an existing registration is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] for any other failure.
    pub async fn register(
        sut_url: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api = ApiClient::new(sut_url, timeout)?;
        let body = json!({
            "name": "admin",
            "orgName": "integration.test",
            "email": email,
            "password": password,
        });
        let response = api.send_raw(Method::POST, "/api/v1/register", &[], Some(&body)).await?;
        if response.is_success() {
            info!(email, "admin registered");
            return Ok(());
        }
        if response.status < 500 && response.body.to_ascii_lowercase().contains("already") {
            info!(email, "admin already registered");
            return Ok(());
        }
        response.success().map(drop)
    }

    /// Registers if needed, then logs in.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when either step fails.
    pub async fn bootstrap(
        sut_url: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Self::register(sut_url, email, password, timeout).await?;
        Self::login(sut_url, email, password, timeout).await
    }
}
