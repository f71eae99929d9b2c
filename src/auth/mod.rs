//! Authentication and authorization.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → resolver.rs (provider verifies token → profile lookup → Identity)
//!     → request extensions (Identity, one request only)
//!     → policy.rs (operation allow-list → permit / deny)
//! ```
//!
//! # Design Decisions
//! - Fail closed: missing token, rejected token, missing/inactive profile
//!   or an unrecognised role all stop the request
//! - Identity and role are re-resolved on every request; nothing is cached

pub mod identity;
pub mod policy;
pub mod provider;
pub mod resolver;

pub use identity::{Identity, Role};
pub use policy::{permit, Operation, RolePolicy};
pub use provider::{HttpIdentityProvider, IdentityProvider, VerifiedUser};
pub use resolver::{bearer_token, AccessContext, AuthError, AuthResolver};
