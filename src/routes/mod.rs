//! HTTP routes for the enrollment engine

pub mod enrollments;
pub mod health;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::ElimuError;

pub use enrollments::handle_enrollment_request;
pub use health::{health_check, readiness_check};

/// API error envelope
#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
    code: &'static str,
}

/// Build a JSON response from a serializable value
pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        })
}

/// Build a JSON error response from an engine error
pub(crate) fn error_response(err: ElimuError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    let body = ApiErrorBody {
        error: err.to_string(),
        code: err.code(),
    };
    json_response(status, &body)
}

/// Not found response for unmatched paths
pub(crate) fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
