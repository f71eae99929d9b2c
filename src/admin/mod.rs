//! Operator endpoints. Authenticated and role-gated like every other route.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::Operation;
use crate::http::middleware::RouteGuard;
use crate::http::server::AppState;
use self::handlers::*;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/admin/status",
            state.guarded(RouteGuard::new(Operation::ViewSystemStatus), get(get_status)),
        )
        .route(
            "/admin/retention/sweep",
            state.guarded(RouteGuard::new(Operation::RunRetentionSweep), post(run_sweep)),
        )
}
