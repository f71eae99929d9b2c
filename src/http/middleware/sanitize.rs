//! Body sanitization stage.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::http::request::SanitizedBody;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::sanitizer;

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let mime = v.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
}

/// Buffer a JSON body, sanitize every string in it, and hand the cleaned
/// document on both as the body and as a [`SanitizedBody`] extension.
/// Non-JSON and empty bodies pass through untouched.
pub async fn sanitize_body(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !is_json(&req) {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let bytes = body::to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|_| ApiError::BadRequest("Request body could not be read"))?;

    if bytes.is_empty() {
        return Ok(next.run(Request::from_parts(parts, Body::empty())).await);
    }

    let parsed: Value = serde_json::from_slice(&bytes)
        .map_err(|_| ApiError::BadRequest("Request body is not valid JSON"))?;
    let clean = sanitizer::sanitize(parsed);
    let encoded = serde_json::to_vec(&clean).map_err(|e| ApiError::Internal(e.to_string()))?;

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.extensions.insert(SanitizedBody(clean));
    Ok(next.run(Request::from_parts(parts, Body::from(encoded))).await)
}
