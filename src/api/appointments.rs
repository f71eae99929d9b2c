use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::http::{ApiError, AppState, ValidatedRecord};
use crate::outbox::NotificationKind;
use crate::store::APPOINTMENTS;

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(ValidatedRecord(mut record)): Extension<ValidatedRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    record.insert("status".into(), json!("scheduled"));
    record.insert("created_by".into(), json!(identity.id));
    record.insert("created_at".into(), json!(Utc::now().to_rfc3339()));

    let stored = state.store.insert(APPOINTMENTS, Value::Object(record)).await?;

    let patient_id = stored.get("patientId").and_then(Value::as_str).unwrap_or_default();
    state
        .outbox
        .enqueue(
            NotificationKind::AppointmentScheduled,
            patient_id,
            json!({
                "appointmentId": stored.get("id"),
                "startTime": stored.get("startTime"),
                "type": stored.get("type"),
            }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(stored)))
}
