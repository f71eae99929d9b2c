//! Error responses.
//!
//! # Responsibilities
//! - Map every pipeline and handler failure to one status code and body
//! - Keep internals out of bodies unless debug output is switched on
//!
//! # Design Decisions
//! - Bodies share one shape: `{ error, message?, details?, code? }`
//! - Collaborator failures become 503 with `retryable: true`; the detailed
//!   cause rides along as a [`DebugBody`] extension that only the debug
//!   layer ever writes out

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::auth::{AuthError, Role};
use crate::resilience::CollaboratorError;
use crate::validation::ValidationFailure;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Insufficient permissions")]
    InsufficientPermissions {
        required: Vec<Role>,
        current: Option<Role>,
    },

    #[error("Validation failed")]
    Validation(#[from] ValidationFailure),

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid CSRF token")]
    CsrfMismatch,

    #[error("Malformed request: {0}")]
    BadRequest(&'static str),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Unavailable(#[from] CollaboratorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => ApiError::Unauthenticated(msg),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::Unavailable(e) => ApiError::Unavailable(e),
        }
    }
}

/// Full diagnostic body, attached to 5xx responses as an extension.
#[derive(Debug, Clone)]
pub struct DebugBody(pub Value);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_)
            | ApiError::InsufficientPermissions { .. }
            | ApiError::CsrfMismatch => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body a client sees.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Unauthenticated(msg) | ApiError::Forbidden(msg) => json!({ "error": msg }),
            ApiError::InsufficientPermissions { required, current } => json!({
                "error": "Insufficient permissions",
                "required": required,
                "current": current,
            }),
            ApiError::Validation(failure) => json!({
                "error": "Validation failed",
                "details": { "errors": failure.errors },
            }),
            ApiError::RateLimited { retry_after_secs } => json!({
                "error": "Too many requests",
                "retryAfter": retry_after_secs,
            }),
            ApiError::CsrfMismatch => json!({
                "error": "Invalid CSRF token",
                "code": "CSRF_TOKEN_INVALID",
            }),
            ApiError::BadRequest(msg) => json!({ "error": "Bad request", "message": msg }),
            ApiError::NotFound => json!({ "error": "Not found" }),
            ApiError::Conflict(msg) => json!({ "error": "Conflict", "message": msg }),
            ApiError::Unavailable(e) => json!({
                "error": "Service temporarily unavailable",
                "code": "COLLABORATOR_UNAVAILABLE",
                "retryable": e.is_retryable(),
            }),
            ApiError::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }

    fn debug_body(&self) -> Option<Value> {
        let mut body = self.body();
        match self {
            ApiError::Unavailable(_) | ApiError::Internal(_) => {
                body["message"] = Value::String(self.to_string());
                Some(body)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let mut response = (self.status(), Json(self.body())).into_response();
        if let ApiError::RateLimited { retry_after_secs } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }
        if let Some(debug) = self.debug_body() {
            response.extensions_mut().insert(DebugBody(debug));
        }
        response
    }
}

/// Swap in the diagnostic body where one was attached. Installed only when
/// `server.debug` is on.
pub async fn expose_debug_detail(mut response: Response) -> Response {
    if let Some(DebugBody(body)) = response.extensions_mut().remove::<DebugBody>() {
        let bytes = body.to_string();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response.headers_mut().remove(header::CONTENT_LENGTH);
        *response.body_mut() = Body::from(bytes);
    }
    response
}
