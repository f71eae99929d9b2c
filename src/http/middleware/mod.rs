//! Request pipeline stages.
//!
//! # Data Flow
//! ```text
//! every request:        sanitize → csrf
//! authenticated routes: → authenticate (Identity into extensions)
//! per route:            → guard (role gate → schema → rate limit)
//!                       → handler
//! ```
//!
//! Each stage either forwards the request or answers with an [`ApiError`];
//! a later stage never runs after an earlier one refused.
//!
//! [`ApiError`]: crate::http::response::ApiError

pub mod auth;
pub mod csrf;
pub mod guard;
pub mod sanitize;
pub mod telemetry;

pub use auth::authenticate;
pub use csrf::csrf_guard;
pub use guard::{enforce_route_policy, RouteGuard};
pub use sanitize::sanitize_body;
pub use telemetry::track_requests;
