//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz - readiness (which storage backend is serving?)

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Git commit the binary was built from
    pub commit: &'static str,
    /// Operating mode
    pub mode: &'static str,
    /// Node identifier
    pub node_id: String,
    /// Current timestamp
    pub timestamp: String,
}

/// Readiness response body
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    /// Storage backend serving requests ("mongodb" or "memory")
    pub storage: &'static str,
}

fn json(status: StatusCode, body: &impl Serialize) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap()
}

/// Handle GET /health
pub fn health_check(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let body = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json(StatusCode::OK, &body)
}

/// Handle GET /ready
pub fn readiness_check(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let body = ReadinessResponse {
        ready: true,
        storage: state.storage,
    };
    json(StatusCode::OK, &body)
}
