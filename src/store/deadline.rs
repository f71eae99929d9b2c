//! Store wrapper that bounds every call with a deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Filter, RecordStore, SERVICE};
use crate::resilience::{with_deadline, CollaboratorError};

#[derive(Clone)]
pub struct DeadlineStore {
    inner: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl DeadlineStore {
    pub fn new(inner: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl RecordStore for DeadlineStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.select(collection, filter)).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Value, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.insert(collection, record)).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.update(collection, filter, patch)).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.delete(collection, filter)).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.rpc(function, args)).await
    }

    async fn mark_for_deletion(&self) -> Result<u64, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.mark_for_deletion()).await
    }

    async fn log_security_event(&self, fields: Value) -> Result<String, CollaboratorError> {
        with_deadline(SERVICE, self.timeout, self.inner.log_security_event(fields)).await
    }
}
