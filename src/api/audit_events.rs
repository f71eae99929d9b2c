use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::{Filter, SECURITY_EVENTS};
use crate::http::{ApiError, AppState};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
    pub action_type: Option<String>,
    pub user_id: Option<String>,
}

/// Most recent audit events first.
pub async fn list_audit_events(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let mut filter = Filter::new().order_desc("created_at").limit(limit);
    if let Some(action) = query.action_type {
        filter = filter.eq("action_type", action);
    }
    if let Some(user) = query.user_id {
        filter = filter.eq("user_id", user);
    }
    let events = state.store.select(SECURITY_EVENTS, &filter).await?;
    Ok(Json(json!({ "events": events })))
}
