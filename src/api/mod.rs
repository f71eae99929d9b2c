//! Business endpoints behind the pipeline.
//!
//! Handlers only ever see requests that passed every stage: the caller's
//! [`Identity`](crate::auth::Identity) and, for routes with a schema, the
//! [`ValidatedRecord`](crate::http::ValidatedRecord) are in extensions.

pub mod appointments;
pub mod audit_events;
pub mod csrf;
pub mod patients;
pub mod payments;
pub mod staff;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
