//! Error types for the enrollment engine
//!
//! Every engine error is a local validation failure or a store-reported
//! conflict. Nothing is recovered silently and nothing is retried here;
//! transient store failures belong to the store client.

use hyper::StatusCode;

/// Main error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum ElimuError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Invalid lesson numbers: {}", format_lessons(.lessons))]
    InvalidLesson { lessons: Vec<i64> },

    #[error("Lessons must be completed in order: lesson {missing} is not complete")]
    OutOfOrder { missing: u32 },

    #[error("Enrollment is not yet completed")]
    NotEligible,

    #[error("Enrollment was modified concurrently, retry with fresh state")]
    Conflict,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_lessons(lessons: &[i64]) -> String {
    lessons
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ElimuError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyEnrolled => StatusCode::CONFLICT,
            Self::InvalidLesson { .. } => StatusCode::BAD_REQUEST,
            Self::OutOfOrder { .. } => StatusCode::BAD_REQUEST,
            Self::NotEligible => StatusCode::CONFLICT,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Auth(_) => "NOT_AUTHENTICATED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::InvalidLesson { .. } => "INVALID_LESSON",
            Self::OutOfOrder { .. } => "OUT_OF_ORDER",
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::Conflict => "CONFLICT",
            Self::Database(_) => "DATABASE",
            Self::Config(_) => "CONFIG",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for ElimuError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ElimuError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for ElimuError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for ElimuError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ElimuError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("JWT error: {}", err))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ElimuError>;
