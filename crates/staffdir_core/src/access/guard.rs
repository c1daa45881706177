//! Per-operation access decisions for employee records.
//!
//! # Invariants
//! - ADMIN is allowed every operation.
//! - EMPLOYEE may list, and may view/update/mark attendance only on the
//!   record linked to its own username.
//! - A record with no linked user is never accessible to EMPLOYEE.
//! - Decisions are pure: no storage access, no ambient principal.

use crate::model::employee::Employee;
use crate::model::user::{Principal, Role};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Directory operation subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    View,
    List,
    Create,
    Update,
    Delete,
    MarkAttendance,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::MarkAttendance => "mark_attendance",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal's role never grants this operation.
    RoleNotPermitted,
    /// The target record is linked to a different user.
    NotOwner,
    /// The target record has no linked user.
    NoLinkedUser,
    /// A single-record operation was checked without a target.
    MissingTarget,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleNotPermitted => "role_not_permitted",
            Self::NotOwner => "not_owner",
            Self::NoLinkedUser => "no_linked_user",
            Self::MissingTarget => "missing_target",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Denied access, kept distinct from not-found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub username: String,
    pub role: Role,
    pub operation: Operation,
    pub reason: DenyReason,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "access denied: {} `{}` may not {} ({})",
            self.role,
            self.username,
            self.operation,
            self.reason.as_str()
        )
    }
}

impl Error for AccessDenied {}

/// Stateless authorization policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decides whether `principal` may perform `operation` on `target`.
    ///
    /// `target` is ignored for `List` and `Create`.
    pub fn can_access(
        &self,
        principal: &Principal,
        target: Option<&Employee>,
        operation: Operation,
    ) -> AccessDecision {
        if principal.role == Role::Admin {
            return AccessDecision::Allow;
        }

        match operation {
            Operation::List => AccessDecision::Allow,
            Operation::Create | Operation::Delete => {
                AccessDecision::Deny(DenyReason::RoleNotPermitted)
            }
            Operation::View | Operation::Update | Operation::MarkAttendance => {
                let Some(target) = target else {
                    return AccessDecision::Deny(DenyReason::MissingTarget);
                };
                match target.linked_username.as_deref() {
                    None => AccessDecision::Deny(DenyReason::NoLinkedUser),
                    Some(owner) if owner == principal.username => AccessDecision::Allow,
                    Some(_) => AccessDecision::Deny(DenyReason::NotOwner),
                }
            }
        }
    }

    /// Same as [`AccessGuard::can_access`], as a `Result`.
    pub fn check(
        &self,
        principal: &Principal,
        target: Option<&Employee>,
        operation: Operation,
    ) -> Result<(), AccessDenied> {
        match self.can_access(principal, target, operation) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => Err(AccessDenied {
                username: principal.username.clone(),
                role: principal.role,
                operation,
                reason,
            }),
        }
    }
}
