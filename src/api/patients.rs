use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::audit::{AuditEvent, RiskLevel};
use crate::auth::Identity;
use crate::http::{ApiError, AppState, ValidatedRecord};
use crate::store::{Filter, PATIENTS};

const PAGE_SIZE: usize = 100;

pub async fn list_patients(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = state
        .store
        .select(
            PATIENTS,
            &Filter::new().order_desc("created_at").limit(PAGE_SIZE),
        )
        .await?;
    Ok(Json(json!({ "patients": rows })))
}

pub async fn create_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(ValidatedRecord(mut record)): Extension<ValidatedRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    record.insert("created_by".into(), json!(identity.id));
    record.insert("created_at".into(), json!(Utc::now().to_rfc3339()));

    let stored = state.store.insert(PATIENTS, Value::Object(record)).await?;
    let patient_id = stored.get("id").and_then(Value::as_str).unwrap_or_default();

    state
        .audit
        .record(
            AuditEvent::new("patient_created", "patient")
                .actor(identity.id.as_str())
                .resource(patient_id)
                .risk(RiskLevel::Medium),
        )
        .await;

    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .store
        .delete(PATIENTS, &Filter::new().eq("id", id.as_str()))
        .await?;
    if removed == 0 {
        return Err(ApiError::NotFound);
    }

    state
        .audit
        .record(
            AuditEvent::new("patient_deleted", "patient")
                .actor(identity.id.as_str())
                .resource(id.as_str())
                .risk(RiskLevel::High),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
