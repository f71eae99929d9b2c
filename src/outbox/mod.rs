//! Notification outbox.
//!
//! Outbound email is delivered by a separate worker that drains the
//! `notification_outbox` collection. This side only guarantees the write
//! attempt: a failed enqueue is logged and the request carries on.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::store::{RecordStore, NOTIFICATION_OUTBOX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AppointmentScheduled,
    StaffInvitation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AppointmentScheduled => "appointment_scheduled",
            NotificationKind::StaffInvitation => "staff_invitation",
        }
    }
}

#[derive(Clone)]
pub struct Outbox {
    store: Arc<dyn RecordStore>,
}

impl Outbox {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Queue one notification. Returns whether the row was written.
    pub async fn enqueue(&self, kind: NotificationKind, recipient: &str, payload: Value) -> bool {
        let row = json!({
            "kind": kind.as_str(),
            "recipient": recipient,
            "payload": payload,
            "status": "pending",
            "created_at": Utc::now().to_rfc3339(),
        });
        match self.store.insert(NOTIFICATION_OUTBOX, row).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "Failed to enqueue notification");
                false
            }
        }
    }
}
