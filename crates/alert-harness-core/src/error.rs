// crates/alert-harness-core/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Error taxonomy shared by every harness component.
// Purpose: Classify failures so setup aborts, cleanup logs, and assertions report.
// Dependencies: thiserror, reqwest, alert-harness-config
// ============================================================================

//! ## Overview
//! [`HarnessError`] carries every failure a harness component can raise.
//! [`HarnessError::kind`] folds the variants onto [`ErrorKind`], the five
//! handling classes callers branch on.
//!
//! Invariants:
//! - Protocol errors always carry the endpoint, the status, and the response text.
//! - Assertion errors carry a full [`AssertionReport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use alert_harness_config::ConfigError;
use thiserror::Error;

use crate::orchestrator::AssertionReport;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result alias used across the harness.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Handling class of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection reset, timeout, or 5xx; not retried outside the verify loop.
    Transient,
    /// Unexpected status code or body shape.
    Protocol,
    /// Expectation not met before the deadline.
    Assertion,
    /// Resource could not be set up; aborts the run.
    SetupFatal,
    /// Failure while releasing resources; logged, never raised from teardown.
    Cleanup,
}

impl ErrorKind {
    /// Stable lowercase label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Protocol => "protocol",
            Self::Assertion => "assertion",
            Self::SetupFatal => "setup_fatal",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Harness failures.
///
/// # Invariants
/// - Variants are stable for classification.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Transport failure or server-side error.
    #[error("transient failure calling {endpoint}: {message}")]
    Transient {
        /// Endpoint that failed.
        endpoint: String,
        /// Failure detail.
        message: String,
    },
    /// Unexpected status or body shape.
    #[error("unexpected response from {endpoint} (status {status}): {body}")]
    Protocol {
        /// Endpoint that answered.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response text.
        body: String,
    },
    /// Expectations were not satisfied.
    #[error("{0}")]
    Assertion(Box<AssertionReport>),
    /// Setup of a shared resource failed.
    #[error("setup failed: {0}")]
    SetupFatal(String),
    /// Teardown of a resource failed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),
    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(String),
    /// JSON encoding or decoding failure.
    #[error("json error: {0}")]
    Json(String),
    /// Telemetry store rejected a write or query.
    #[error("telemetry store error: {0}")]
    Store(String),
    /// Caller supplied an invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Harness configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HarnessError {
    /// Returns the handling class for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient {
                ..
            }
            | Self::Store(_) => ErrorKind::Transient,
            Self::Protocol {
                ..
            }
            | Self::Json(_) => ErrorKind::Protocol,
            Self::Assertion(_) => ErrorKind::Assertion,
            Self::Cleanup(_) => ErrorKind::Cleanup,
            Self::SetupFatal(_) | Self::Io(_) | Self::InvalidInput(_) | Self::Config(_) => {
                ErrorKind::SetupFatal
            }
        }
    }

    /// Classifies a non-success HTTP status: 5xx is transient, anything else
    /// is a protocol error.
    #[must_use]
    pub fn from_status(endpoint: &str, status: u16, body: String) -> Self {
        if status >= 500 {
            return Self::Transient {
                endpoint: endpoint.to_string(),
                message: format!("status {status}: {body}"),
            };
        }
        Self::Protocol {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }

    /// Wraps a reqwest transport error.
    #[must_use]
    pub fn transport(endpoint: &str, err: &reqwest::Error) -> Self {
        Self::Transient {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    /// Builds a protocol error for a 2xx response whose body has the wrong shape.
    #[must_use]
    pub fn bad_body(endpoint: &str, status: u16, detail: &str, body: &str) -> Self {
        Self::Protocol {
            endpoint: endpoint.to_string(),
            status,
            body: format!("{detail}: {body}"),
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
