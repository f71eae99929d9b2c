//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to identity provider / record store:
//!     → timeouts.rs (enforce deadline)
//!     → CollaboratorError on timeout or failure
//!     → caller decides: surface as 503, or swallow (audit, outbox)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries inside the pipeline; callers see retryable errors

pub mod timeouts;

pub use timeouts::{with_deadline, CollaboratorError};
