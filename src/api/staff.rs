use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::audit::{AuditEvent, RiskLevel};
use crate::auth::Identity;
use crate::http::{ApiError, AppState, ValidatedRecord};
use crate::outbox::NotificationKind;
use crate::store::STAFF_INVITATIONS;

/// How long an invitation link stays valid.
const INVITATION_TTL_DAYS: i64 = 7;

pub async fn invite_staff(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(ValidatedRecord(mut record)): Extension<ValidatedRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let token = uuid::Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    record.insert("invited_by".into(), json!(identity.id));
    record.insert("status".into(), json!("pending"));
    record.insert("token".into(), json!(token));
    record.insert("created_at".into(), json!(now.to_rfc3339()));
    record.insert(
        "expires_at".into(),
        json!((now + Duration::days(INVITATION_TTL_DAYS)).to_rfc3339()),
    );

    let mut stored = state
        .store
        .insert(STAFF_INVITATIONS, Value::Object(record))
        .await?;

    let email = stored.get("email").and_then(Value::as_str).unwrap_or_default().to_string();
    let role = stored.get("role").cloned().unwrap_or(Value::Null);
    let invitation_id = stored.get("id").and_then(Value::as_str).unwrap_or_default().to_string();

    state
        .outbox
        .enqueue(
            NotificationKind::StaffInvitation,
            &email,
            json!({ "invitationId": invitation_id, "role": role, "token": token }),
        )
        .await;

    state
        .audit
        .record(
            AuditEvent::new("staff_invited", "staff_invitation")
                .actor(identity.id.as_str())
                .resource(invitation_id)
                .risk(RiskLevel::High)
                .meta("role", role),
        )
        .await;

    // The token only ever travels by email.
    if let Some(obj) = stored.as_object_mut() {
        obj.remove("token");
    }
    Ok((StatusCode::CREATED, Json(stored)))
}
