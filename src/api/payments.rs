//! Payment recording.
//!
//! Card details are validated upstream but never stored: the persisted
//! row keeps only the last four digits of the card number.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::audit::{AuditEvent, RiskLevel};
use crate::auth::Identity;
use crate::http::{ApiError, AppState, ValidatedRecord};
use crate::store::PAYMENTS;
use crate::validation::Record;

/// Fields copied verbatim from the validated request.
const STORED_FIELDS: [&str; 4] = ["patientId", "amount", "paymentMethod", "reference"];

fn last_four(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(char::is_ascii_digit).collect();
    digits[digits.len().saturating_sub(4)..].iter().collect()
}

/// Row to persist for a validated payment request.
pub fn payment_row(record: &Record, recorded_by: &str) -> Map<String, Value> {
    let mut row: Map<String, Value> = STORED_FIELDS
        .iter()
        .filter_map(|&k| record.get(k).map(|v| (k.to_string(), v.clone())))
        .collect();
    if let Some(card) = record.get("cardNumber").and_then(Value::as_str) {
        row.insert("cardLastFour".into(), json!(last_four(card)));
    }
    row.insert("recorded_by".into(), json!(recorded_by));
    row.insert("created_at".into(), json!(Utc::now().to_rfc3339()));
    row
}

pub async fn record_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(ValidatedRecord(record)): Extension<ValidatedRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = payment_row(&record, &identity.id);
    let stored = state.store.insert(PAYMENTS, Value::Object(row)).await?;

    let mut event = AuditEvent::new("payment_recorded", "payment")
        .actor(identity.id.as_str())
        .risk(RiskLevel::Medium)
        .meta("amount", record.get("amount").cloned().unwrap_or(Value::Null))
        .meta("payment_method", record.get("paymentMethod").cloned().unwrap_or(Value::Null));
    if let Some(id) = stored.get("id").and_then(Value::as_str) {
        event = event.resource(id);
    }
    state.audit.record(event).await;

    Ok((StatusCode::CREATED, Json(stored)))
}
