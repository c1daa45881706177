//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, cache and access-guard calls into use-case
//!   level APIs.
//! - Map lower-layer failures onto the public [`DirectoryError`] taxonomy.

pub mod directory;
pub mod error;
pub mod user_service;

pub use error::{DirectoryError, DirectoryResult};
