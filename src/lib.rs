//! Clinic API guard library.
//!
//! Request validation and authorization pipeline for the clinic
//! management API: sanitize → CSRF → authenticate → role gate →
//! schema validation → rate limit → handler, with an audit trail and a
//! scheduled retention sweep alongside.

pub mod admin;
pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod outbox;
pub mod resilience;
pub mod retention;
pub mod security;
pub mod store;
pub mod validation;

pub use config::schema::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
