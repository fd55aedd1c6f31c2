//! Enrollment API endpoints
//!
//! ## Endpoints
//!
//! - `POST  /api/courses/{id}/enroll` - Enroll the calling learner
//! - `GET   /api/enrollments` - List the caller's enrollments
//! - `GET   /api/enrollments/{id}` - Get a single enrollment
//! - `PATCH /api/enrollments/{id}` - Replace the completed-lesson set
//! - `GET   /api/enrollments/{id}/certificate` - Certificate data
//!
//! ## Authentication
//!
//! All endpoints resolve the calling learner from a JWT bearer token
//! (dev mode: `x-learner-id` header). Ownership checks happen in the
//! service layer; handlers only decode, delegate, and encode.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::auth::resolve_learner;
use crate::catalog::CourseSummary;
use crate::db::schemas::{EnrollmentDoc, EnrollmentStatus};
use crate::enrollment::EnrollmentWithCourse;
use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::ElimuError;

/// Enrollment as rendered at the API boundary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: String,
    pub learner_id: String,
    pub course_id: String,
    pub completed_lessons: Vec<u32>,
    pub status: EnrollmentStatus,
    pub enrolled_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseSummary>,
}

impl EnrollmentView {
    fn new(enrollment: EnrollmentDoc, course: Option<CourseSummary>) -> Self {
        Self {
            id: enrollment.id_hex().unwrap_or_default(),
            learner_id: enrollment.learner_id,
            course_id: enrollment.course_id,
            completed_lessons: enrollment.completed_lessons,
            status: enrollment.status,
            enrolled_at: enrollment.enrolled_at.to_chrono().to_rfc3339(),
            completed_at: enrollment
                .completed_at
                .map(|ts| ts.to_chrono().to_rfc3339()),
            version: enrollment.version,
            course,
        }
    }
}

impl From<EnrollmentWithCourse> for EnrollmentView {
    fn from(joined: EnrollmentWithCourse) -> Self {
        Self::new(joined.enrollment, joined.course)
    }
}

/// Body of a progress update.
///
/// Lesson numbers deserialize as signed integers so a negative index reaches
/// the validator and comes back in the `InvalidLesson` listing instead of
/// failing as a type error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub completed_lessons: Vec<i64>,
}

/// Handle /api/* enrollment routes; returns `None` for unmatched paths
pub async fn handle_enrollment_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<Full<Bytes>>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .map(|s| s.to_string())
        .collect();
    let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();

    // Resolve the caller before touching the body; every route needs it
    let learner_id = match resolve_learner(req.headers(), &state.jwt, state.args.dev_mode) {
        Ok(id) => id,
        Err(e) => return Some(error_response(e)),
    };

    debug!("[{}] {} {}", learner_id, method, path);

    let response = match (&method, segments.as_slice()) {
        (&Method::POST, ["api", "courses", course_id, "enroll"]) => {
            match state.enrollments.enroll(&learner_id, course_id).await {
                Ok(enrollment) => {
                    json_response(StatusCode::CREATED, &EnrollmentView::new(enrollment, None))
                }
                Err(e) => error_response(e),
            }
        }

        (&Method::GET, ["api", "enrollments"]) => {
            match state.enrollments.list_enrollments(&learner_id).await {
                Ok(listed) => {
                    let views: Vec<EnrollmentView> =
                        listed.into_iter().map(EnrollmentView::from).collect();
                    json_response(StatusCode::OK, &views)
                }
                Err(e) => error_response(e),
            }
        }

        (&Method::GET, ["api", "enrollments", enrollment_id]) => {
            match state
                .enrollments
                .get_enrollment(enrollment_id, &learner_id)
                .await
            {
                Ok(joined) => json_response(StatusCode::OK, &EnrollmentView::from(joined)),
                Err(e) => error_response(e),
            }
        }

        (&Method::PATCH, ["api", "enrollments", enrollment_id]) => {
            let enrollment_id = enrollment_id.to_string();
            let body = match read_json_body::<UpdateProgressRequest>(req).await {
                Ok(b) => b,
                Err(e) => return Some(error_response(e)),
            };

            match state
                .enrollments
                .update_progress(&enrollment_id, &learner_id, &body.completed_lessons)
                .await
            {
                Ok(enrollment) => {
                    json_response(StatusCode::OK, &EnrollmentView::new(enrollment, None))
                }
                Err(e) => error_response(e),
            }
        }

        (&Method::GET, ["api", "enrollments", enrollment_id, "certificate"]) => {
            match state
                .certificates
                .certificate_data(enrollment_id, &learner_id)
                .await
            {
                Ok(data) => json_response(StatusCode::OK, &data),
                Err(e) => error_response(e),
            }
        }

        _ => return None,
    };

    Some(response)
}

/// Collect and decode a JSON request body
async fn read_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, ElimuError> {
    let bytes = req
        .collect()
        .await
        .map_err(|e| ElimuError::BadRequest(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|_| {
        ElimuError::BadRequest("completedLessons must be an array of lesson numbers".into())
    })
}
