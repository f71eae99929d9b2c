//! Authentication stage.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, AccessContext};
use crate::http::request::{client_ip, user_agent};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics::{self, Stage};

/// Resolve the caller and attach their [`Identity`](crate::auth::Identity)
/// to the request. Identity is looked up fresh on every request.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let access = AccessContext {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        ip: client_ip(&req),
        user_agent: user_agent(&req),
    };
    let token = bearer_token(req.headers()).map(str::to_owned);

    let identity = match state.resolver.resolve(token.as_deref(), &access).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::info!(path = %access.path, ip = %access.ip, reason = %e, "Authentication refused");
            metrics::record_rejection(Stage::Auth);
            return Err(e.into());
        }
    };

    tracing::debug!(user_id = %identity.id, role = %identity.role, "Caller authenticated");
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
