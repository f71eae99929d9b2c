//! Declarative schema validation.
//!
//! # Data Flow
//! ```text
//! sanitized JSON body
//!     → catalog.rs (route's SchemaName → Schema)
//!     → schema.rs (every field, every rule, in declaration order)
//!     → rule.rs / custom.rs (built-in and named cross-field rules)
//!     → Record containing declared fields only, or ValidationFailure
//! ```
//!
//! # Design Decisions
//! - No short-circuit: callers get every violation in one round trip
//! - Schemas are built once and shared read-only behind `Arc`
//! - Named rules are resolved while the catalog is built; an unknown name
//!   is a startup error, never a per-request lookup

pub mod catalog;
pub mod custom;
pub mod error;
pub mod rule;
pub mod schema;

pub use catalog::{SchemaCatalog, SchemaName};
pub use error::{FieldError, ValidationFailure};
pub use rule::{Record, Rule, RuleContext, RuleRegistry};
pub use schema::Schema;
