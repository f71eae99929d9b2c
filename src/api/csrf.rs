use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    Json,
};
use serde_json::{json, Value};

use crate::http::{ApiError, AppState};
use crate::security::csrf;

/// Issue a fresh token, bound to the caller through a cookie.
pub async fn issue_csrf_token(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    let token = csrf::issue_token();
    let cookie = csrf::session_cookie(&state.config.csrf.cookie_name, &token);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok((headers, Json(json!({ "csrfToken": token }))))
}
