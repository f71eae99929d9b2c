//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → sanitizer.rs (strip markup and script vectors from JSON strings)
//!     → csrf.rs (header token must match the session cookie on mutations)
//!     → ... authentication, role gate, schema validation ...
//!     → rate_limit.rs (sliding window per scope and client)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod csrf;
pub mod rate_limit;
pub mod sanitizer;

pub use rate_limit::{InMemoryRateLimitStore, RateDecision, RateLimitStore, RateLimiter};
