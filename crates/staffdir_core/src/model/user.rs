//! User (principal record) and per-request principal.
//!
//! # Invariants
//! - `username` is unique and required.
//! - The password hash is opaque to this crate and never serialized.
//! - A user links to at most one employee and vice versa.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::employee::EmployeeId;

pub type UserId = Uuid;

pub const USERNAME_MAX_CHARS: usize = 50;

/// Authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Employee => "EMPLOYEE",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl Display for UnknownRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role `{}`; expected ADMIN|EMPLOYEE", self.0)
    }
}

impl Error for UnknownRole {}

/// Parses a role name, case-insensitively, with optional `ROLE_` prefix.
pub fn parse_role(value: &str) -> Result<Role, UnknownRole> {
    let upper = value.trim().to_ascii_uppercase();
    match upper.strip_prefix("ROLE_").unwrap_or(&upper) {
        "ADMIN" => Ok(Role::Admin),
        "EMPLOYEE" => Ok(Role::Employee),
        _ => Err(UnknownRole(value.to_string())),
    }
}

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Public view of a user. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            employee_id: user.employee_id,
        }
    }
}

/// Authenticated identity attached to one inbound operation.
///
/// Resolved outside this crate and passed explicitly into every call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, Role::Admin)
    }

    pub fn employee(username: impl Into<String>) -> Self {
        Self::new(username, Role::Employee)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
