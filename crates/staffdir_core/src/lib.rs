//! Core domain logic for the staff directory.
//! This crate is the single source of truth for employee, attendance and
//! access-control invariants.

pub mod access;
pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use access::{AccessDecision, AccessDenied, AccessGuard, DenyReason, Operation};
pub use cache::{CacheStats, EmployeeCache};
pub use config::{ConfigError, StaffdirConfig};
pub use db::{open_db, open_db_in_memory, DbError, SharedConnection};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::attendance::{AttendanceLedger, AttendanceRecord};
pub use model::employee::{Employee, EmployeeId, EmployeeInput, EmployeeValidationError};
pub use model::user::{parse_role, Principal, Role, User, UserId, UserProfile};
pub use query::filter::{compile_filter, EmployeeFilter, EmployeePredicate, FilterError};
pub use query::page::{Page, PageInfo, PageRequest, SortDirection, SortField, SortSpec};
pub use repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::directory::{EmployeeDirectory, ListRequest};
pub use service::user_service::UserService;
pub use service::{DirectoryError, DirectoryResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
