//! Deadlines for collaborator calls.
//!
//! # Design Decisions
//! - Every call to the identity provider or the record store has a deadline
//! - Timeouts are a distinct, retryable error kind
//! - No lock is held across the awaited call

use std::future::Future;
use std::time::Duration;

/// Failure talking to an external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} did not respond within {timeout:?}")]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("{service} transport error: {detail}")]
    Transport {
        service: &'static str,
        detail: String,
    },

    #[error("{service} rejected the call with status {status}")]
    Rejected { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected payload: {detail}")]
    Decode {
        service: &'static str,
        detail: String,
    },
}

impl CollaboratorError {
    pub fn service(&self) -> &'static str {
        match self {
            CollaboratorError::Timeout { service, .. }
            | CollaboratorError::Transport { service, .. }
            | CollaboratorError::Rejected { service, .. }
            | CollaboratorError::Decode { service, .. } => service,
        }
    }

    /// Whether the caller may usefully try again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Timeout { .. } | CollaboratorError::Transport { .. } => true,
            CollaboratorError::Rejected { status, .. } => *status >= 500 || *status == 429,
            CollaboratorError::Decode { .. } => false,
        }
    }
}

/// Await `fut`, failing with [`CollaboratorError::Timeout`] after `timeout`.
pub async fn with_deadline<T, F>(
    service: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, timeout_ms = timeout.as_millis() as u64, "Collaborator call timed out");
            Err(CollaboratorError::Timeout { service, timeout })
        }
    }
}
