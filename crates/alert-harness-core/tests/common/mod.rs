// crates/alert-harness-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Helpers
// Description: Loopback HTTP servers and captured requests for core tests.
// Purpose: Fake the SUT and mock receiver admin APIs without containers.
// Dependencies: axum, tokio
// ============================================================================

#![allow(dead_code, reason = "Helpers are shared across test binaries.")]

use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use serde_json::Value;
use tokio::sync::oneshot;

/// One request captured by a fake server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Shared capture log.
pub type CaptureLog = Arc<Mutex<Vec<Captured>>>;

/// Serves `app` on an ephemeral loopback port until the sender fires.
pub async fn spawn_server(app: Router) -> (String, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (format!("http://{addr}"), shutdown_tx)
}

/// Counts captured requests with the given method and path prefix.
pub fn count(log: &CaptureLog, method: &str, path_prefix: &str) -> usize {
    log.lock()
        .expect("capture lock")
        .iter()
        .filter(|entry| entry.method == method && entry.path.starts_with(path_prefix))
        .count()
}
