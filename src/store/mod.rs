//! Persistent record store collaborator.
//!
//! # Data Flow
//! ```text
//! handlers / auth resolver / audit / retention
//!     → deadline.rs (bounded wait on every call)
//!     → rest.rs   (hosted database over its REST interface)
//!       memory.rs (process-local store for development and tests)
//! ```
//!
//! # Design Decisions
//! - The store is the only source of truth; nothing here caches rows
//! - Generic select/insert/update/delete on named collections plus two
//!   domain RPCs (`mark_for_deletion`, `log_security_event`)

pub mod deadline;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::resilience::CollaboratorError;

pub use deadline::DeadlineStore;
pub use memory::MemoryStore;
pub use rest::RestStore;

pub const SERVICE: &str = "record store";

pub const PROFILES: &str = "profiles";
pub const PATIENTS: &str = "patients";
pub const APPOINTMENTS: &str = "appointments";
pub const PAYMENTS: &str = "payments";
pub const STAFF_INVITATIONS: &str = "staff_invitations";
pub const SECURITY_EVENTS: &str = "security_events";
pub const NOTIFICATION_OUTBOX: &str = "notification_outbox";

pub const RPC_MARK_FOR_DELETION: &str = "mark_for_deletion";
pub const RPC_LOG_SECURITY_EVENT: &str = "log_security_event";

/// Equality filter with optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<(String, Value)>,
    pub order_desc: Option<String>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_desc = Some(column.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `row` satisfies every equality condition.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CollaboratorError>;

    /// Insert one record and return it as stored.
    async fn insert(&self, collection: &str, record: Value) -> Result<Value, CollaboratorError>;

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, CollaboratorError>;

    /// Delete matching records and return how many were removed.
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, CollaboratorError>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, CollaboratorError>;

    /// Flag stale records for deletion; returns the number flagged.
    async fn mark_for_deletion(&self) -> Result<u64, CollaboratorError> {
        let out = self.rpc(RPC_MARK_FOR_DELETION, json!({})).await?;
        out.as_u64().ok_or_else(|| CollaboratorError::Decode {
            service: SERVICE,
            detail: format!("{RPC_MARK_FOR_DELETION} returned {out}"),
        })
    }

    /// Append an audit event; returns the new event id.
    async fn log_security_event(&self, fields: Value) -> Result<String, CollaboratorError> {
        let out = self.rpc(RPC_LOG_SECURITY_EVENT, fields).await?;
        match out {
            Value::String(id) => Ok(id),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(CollaboratorError::Decode {
                service: SERVICE,
                detail: format!("{RPC_LOG_SECURITY_EVENT} returned {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_all_conditions() {
        let row = json!({ "id": "a", "active": true });
        assert!(Filter::new().eq("id", "a").matches(&row));
        assert!(Filter::new().eq("id", "a").eq("active", true).matches(&row));
        assert!(!Filter::new().eq("id", "a").eq("active", false).matches(&row));
        assert!(!Filter::new().eq("missing", 1).matches(&row));
        assert!(Filter::new().matches(&row));
    }
}
