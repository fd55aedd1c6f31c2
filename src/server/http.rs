//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection is
//! served on its own task; handlers share the application state through an
//! `Arc`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::certificate::CertificateView;
use crate::config::Args;
use crate::enrollment::EnrollmentService;
use crate::routes;
use crate::types::ElimuError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Session token validator
    pub jwt: JwtValidator,
    /// Enrollment and progress engine
    pub enrollments: Arc<EnrollmentService>,
    /// Certificate eligibility read path
    pub certificates: Arc<CertificateView>,
    /// Storage backend label for the readiness probe ("mongodb" or "memory")
    pub storage: &'static str,
}

impl AppState {
    pub fn new(
        args: Args,
        jwt: JwtValidator,
        enrollments: Arc<EnrollmentService>,
        certificates: Arc<CertificateView>,
        storage: &'static str,
    ) -> Self {
        Self {
            args,
            jwt,
            enrollments,
            certificates,
            storage,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ElimuError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Elimu engine listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - x-learner-id header identity accepted");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (&method, path.as_str()) {
        // Health probes
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            routes::health_check(&state)
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            routes::readiness_check(&state)
        }

        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        // Enrollment API
        (_, p) if p.starts_with("/api/") => {
            match routes::handle_enrollment_request(req, Arc::clone(&state)).await {
                Some(response) => response,
                None => routes::not_found_response(&path),
            }
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PATCH, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
