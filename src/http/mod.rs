//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace span, timeout, body limit)
//!     → middleware/ (sanitize → csrf → authenticate → route guard)
//!     → api/ and admin/ handlers
//!     → response.rs (errors → status + JSON body)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{SanitizedBody, ValidatedRecord, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
