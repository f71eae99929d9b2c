//! CSRF stage: mutating requests must echo the session token.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics::{self, Stage};
use crate::security::csrf;

pub async fn csrf_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let config = &state.config.csrf;
    let supplied = req
        .headers()
        .get(config.header_name.as_str())
        .and_then(|v| v.to_str().ok());
    let session = csrf::cookie_value(req.headers(), &config.cookie_name);

    if !csrf::check(req.method(), supplied, session) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            header_present = supplied.is_some(),
            cookie_present = session.is_some(),
            "CSRF check failed"
        );
        metrics::record_rejection(Stage::Csrf);
        return Err(ApiError::CsrfMismatch);
    }
    Ok(next.run(req).await)
}
