//! Role and ownership based authorization.

pub mod guard;

pub use guard::{AccessDecision, AccessDenied, AccessGuard, DenyReason, Operation};
