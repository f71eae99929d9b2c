//! Audit trail of security-relevant actions.
//!
//! # Responsibilities
//! - Shape audit events (who, what, which resource, risk, outcome)
//! - Append them to the record store through `log_security_event`
//!
//! # Design Decisions
//! - Best effort: a failed write is logged and counted, never returned
//! - Append only; this module has no update or delete path
//! - Invoked explicitly after authentication, after privileged mutations
//!   and after retention sweeps

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub user_id: Option<String>,
    pub action_type: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub risk_level: RiskLevel,
    pub metadata: Map<String, Value>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            action_type: action_type.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            risk_level: RiskLevel::Low,
            metadata: Map::new(),
            success: true,
            created_at: Utc::now(),
        }
    }

    pub fn actor(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn risk(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn succeeded(mut self, success: bool) -> Self {
        self.success = success;
        self
    }
}

/// Writes audit events to the store without ever failing the caller.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn RecordStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Append one event. Failures are logged locally and swallowed.
    pub async fn record(&self, event: AuditEvent) {
        let action = event.action_type.clone();
        let fields = match serde_json::to_value(&event) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(action = %action, error = %e, "Failed to encode audit event");
                metrics::record_audit_failure();
                return;
            }
        };
        match self.store.log_security_event(fields).await {
            Ok(id) => {
                tracing::debug!(action = %action, event_id = %id, "Audit event recorded");
            }
            Err(e) => {
                tracing::error!(action = %action, error = %e, "Failed to record audit event");
                metrics::record_audit_failure();
            }
        }
    }

    /// Fire-and-forget variant; the write may complete after the response.
    pub fn record_detached(&self, event: AuditEvent) {
        let logger = self.clone();
        tokio::spawn(async move {
            logger.record(event).await;
        });
    }
}
