//! Authentication for the enrollment engine
//!
//! Session identity is owned by the platform's auth service; this module
//! only validates the JWT bearer tokens it mints and resolves the calling
//! learner for route handlers. Dev mode accepts an `x-learner-id` header so
//! the engine can be driven without the auth service running.

pub mod jwt;

use hyper::header::HeaderMap;

use crate::types::{ElimuError, Result};

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};

/// Resolve the calling learner from request headers.
///
/// Production: `Authorization: Bearer <jwt>` is required and the learner id
/// comes from the validated claims. Dev mode: an `x-learner-id` header is
/// accepted first, falling back to JWT when absent.
pub fn resolve_learner(
    headers: &HeaderMap,
    validator: &JwtValidator,
    dev_mode: bool,
) -> Result<String> {
    if dev_mode {
        if let Some(learner_id) = headers
            .get("x-learner-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            return Ok(learner_id.to_string());
        }
    }

    let auth_header = headers.get("authorization").and_then(|v| v.to_str().ok());
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| ElimuError::Auth("Missing bearer token".into()))?;

    let result = validator.verify_token(token);
    match result.claims {
        Some(claims) => Ok(claims.learner_id),
        None => Err(ElimuError::Auth(
            result.error.unwrap_or_else(|| "Invalid token".into()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn validator() -> JwtValidator {
        JwtValidator::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_from_bearer_token() {
        let v = validator();
        let token = v
            .generate_token(TokenInput {
                learner_id: "learner-1".into(),
                identifier: "test@example.com".into(),
                role: "learner".into(),
            })
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let learner = resolve_learner(&headers, &v, false).unwrap();
        assert_eq!(learner, "learner-1");
    }

    #[test]
    fn test_missing_token_rejected() {
        let headers = HeaderMap::new();
        let err = resolve_learner(&headers, &validator(), false).unwrap_err();
        assert!(matches!(err, ElimuError::Auth(_)));
    }

    #[test]
    fn test_dev_mode_header_identity() {
        let mut headers = HeaderMap::new();
        headers.insert("x-learner-id", HeaderValue::from_static("learner-dev"));

        // Accepted in dev mode, ignored in production
        assert_eq!(
            resolve_learner(&headers, &validator(), true).unwrap(),
            "learner-dev"
        );
        assert!(resolve_learner(&headers, &validator(), false).is_err());
    }
}
