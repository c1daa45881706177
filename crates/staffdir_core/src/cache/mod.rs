//! In-process caching for single-record employee reads.
//!
//! # Invariants
//! - Entries carry no TTL; staleness is bounded by eviction-on-write.
//! - List queries are never cached.

pub mod employee_cache;

pub use employee_cache::{CacheStats, EmployeeCache};
