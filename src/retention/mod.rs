//! Data retention.
//!
//! # Responsibilities
//! - Periodically ask the store to mark stale records for deletion
//! - Audit each completed sweep (count, automated flag)
//! - Offer the same run to the admin-only manual trigger
//!
//! # Design Decisions
//! - One sweep at a time; an overlapping tick or trigger is skipped
//! - A failed store call is logged and the run skipped; no retry in the
//!   same tick since the store operation is a single atomic call

pub mod sweeper;

pub use sweeper::{RetentionSweeper, SweepError, SweepReport, SweepTrigger};
