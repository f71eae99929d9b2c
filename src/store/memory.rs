//! Process-local record store.
//!
//! Used when `store.backend = "memory"` and by the integration tests. Rows
//! are plain JSON objects; `id` is assigned on insert when absent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};

use super::{
    Filter, RecordStore, RPC_LOG_SECURITY_EVENT, RPC_MARK_FOR_DELETION, SECURITY_EVENTS, SERVICE,
};
use crate::resilience::CollaboratorError;

/// Column holding the instant after which a row may be deleted.
pub const RETENTION_UNTIL: &str = "retention_until";
/// Column set by `mark_for_deletion`.
pub const MARKED_FOR_DELETION: &str = "marked_for_deletion";

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing id assignment. Handy for seeding.
    pub fn seed(&self, collection: &str, rows: impl IntoIterator<Item = Value>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a collection.
    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn mark_stale(&self, now: DateTime<Utc>) -> u64 {
        let mut marked = 0;
        for mut rows in self.collections.iter_mut() {
            for row in rows.value_mut().iter_mut() {
                let expired = row
                    .get(RETENTION_UNTIL)
                    .and_then(Value::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .is_some_and(|until| until.with_timezone(&Utc) < now);
                let already = row.get(MARKED_FOR_DELETION) == Some(&Value::Bool(true));
                if expired && !already {
                    if let Some(obj) = row.as_object_mut() {
                        obj.insert(MARKED_FOR_DELETION.to_string(), Value::Bool(true));
                        marked += 1;
                    }
                }
            }
        }
        marked
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CollaboratorError> {
        let mut rows: Vec<Value> = self
            .collections
            .get(collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(column) = &filter.order_desc {
            rows.sort_by(|a, b| {
                let a = a.get(column).map(Value::to_string).unwrap_or_default();
                let b = b.get(column).map(Value::to_string).unwrap_or_default();
                b.cmp(&a)
            });
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, collection: &str, mut record: Value) -> Result<Value, CollaboratorError> {
        let Some(obj) = record.as_object_mut() else {
            return Err(CollaboratorError::Rejected {
                service: SERVICE,
                status: 400,
            });
        };
        obj.entry("id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, CollaboratorError> {
        let Some(patch) = patch.as_object() else {
            return Err(CollaboratorError::Rejected {
                service: SERVICE,
                status: 400,
            });
        };
        let mut updated = Vec::new();
        if let Some(mut rows) = self.collections.get_mut(collection) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                if let Some(obj) = row.as_object_mut() {
                    for (k, v) in patch {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, CollaboratorError> {
        let Some(mut rows) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, CollaboratorError> {
        match function {
            RPC_MARK_FOR_DELETION => Ok(json!(self.mark_stale(Utc::now()))),
            RPC_LOG_SECURITY_EVENT => {
                let stored = self.insert(SECURITY_EVENTS, args).await?;
                Ok(stored.get("id").cloned().unwrap_or(Value::Null))
            }
            _ => Err(CollaboratorError::Rejected {
                service: SERVICE,
                status: 404,
            }),
        }
    }
}
