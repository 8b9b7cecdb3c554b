//! API error types and their single HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use portfolio_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Project not found")]
    ProjectNotFound,

    #[error("Contact not found")]
    ContactNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Too many failed login attempts")]
    Locked { retry_after_secs: u64 },

    #[error("A matching contact was submitted moments ago")]
    DuplicateContact,

    #[error("Payload rejected")]
    PotentialSpam,

    #[error("Payload blocked by suspicious pattern")]
    SuspiciousPayload,

    #[error("Idempotency key must be 8-120 characters of [A-Za-z0-9._-]")]
    InvalidIdempotencyKey,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::ProjectNotFound => (StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND"),
            ApiError::ContactNotFound => (StatusCode::NOT_FOUND, "CONTACT_NOT_FOUND"),
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            ApiError::RouteNotFound => (StatusCode::NOT_FOUND, "ROUTE_NOT_FOUND"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Locked { .. } => (StatusCode::TOO_MANY_REQUESTS, "AUTH_LOCKED"),
            ApiError::DuplicateContact => (StatusCode::CONFLICT, "DUPLICATE_CONTACT"),
            ApiError::PotentialSpam => (StatusCode::BAD_REQUEST, "POTENTIAL_SPAM"),
            ApiError::SuspiciousPayload => (StatusCode::BAD_REQUEST, "SUSPICIOUS_PAYLOAD"),
            ApiError::InvalidIdempotencyKey => {
                (StatusCode::BAD_REQUEST, "INVALID_IDEMPOTENCY_KEY")
            }
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Operator detail stays in the log; response bodies carry only
        // the stable code and a safe message.
        match &self {
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "document store failure");
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
            }
            _ => {}
        }

        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Storage(_) | ApiError::Internal(_) => "Unexpected internal error".to_string(),
            other => other.to_string(),
        };
        let details = match &self {
            ApiError::Locked { retry_after_secs } => {
                json!({ "retryAfterSeconds": retry_after_secs })
            }
            _ => Value::Null,
        };

        let body = Json(json!({
            "error": { "code": code, "message": message, "details": details }
        }));

        let mut response = (status, body).into_response();
        if let ApiError::Locked { retry_after_secs } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
