//! Domain model for the employee directory.
//!
//! # Responsibility
//! - Define the `Employee` aggregate, its attendance ledger and the `User`
//!   principal record.
//! - Own field-level validation for employee input.
//!
//! # Invariants
//! - Every record is identified by a stable, time-ordered UUID.
//! - The attendance ledger is only mutated through the directory service.

pub mod attendance;
pub mod employee;
pub mod user;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
