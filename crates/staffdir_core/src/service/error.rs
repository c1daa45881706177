//! Public error taxonomy for directory and user services.
//!
//! # Invariants
//! - `NotFound` and `AccessDenied` stay distinct; collapsing them is a
//!   transport concern.
//! - Persistence failures never leak as anything but `Internal`.

use crate::access::AccessDenied;
use crate::model::employee::EmployeeValidationError;
use crate::query::filter::FilterError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Debug)]
pub enum DirectoryError {
    /// Target record does not exist.
    NotFound { entity: &'static str, key: String },
    AccessDenied(AccessDenied),
    /// Field-level rejection, using external (camelCase) field names.
    Validation { field: &'static str, message: String },
    /// Unique field already in use.
    Conflict { field: &'static str, value: String },
    /// Unexpected persistence or logic failure.
    Internal(String),
}

impl DirectoryError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine code for external layers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::Validation { .. } => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// Offending field for validation and conflict errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } | Self::Conflict { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::AccessDenied(denied) => write!(f, "{denied}"),
            Self::Validation { field, message } => write!(f, "{field}: {message}"),
            Self::Conflict { field, value } => write!(f, "{field} `{value}` is already in use"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AccessDenied(denied) => Some(denied),
            _ => None,
        }
    }
}

impl From<RepoError> for DirectoryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                key: id.to_string(),
            },
            RepoError::Conflict { field, value } => Self::Conflict { field, value },
            RepoError::Validation(err) => err.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<EmployeeValidationError> for DirectoryError {
    fn from(value: EmployeeValidationError) -> Self {
        Self::Validation {
            field: value.field,
            message: value.message,
        }
    }
}

impl From<FilterError> for DirectoryError {
    fn from(value: FilterError) -> Self {
        Self::Validation {
            field: value.field(),
            message: value.to_string(),
        }
    }
}

impl From<AccessDenied> for DirectoryError {
    fn from(value: AccessDenied) -> Self {
        Self::AccessDenied(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DirectoryError;
    use crate::db::DbError;
    use crate::model::employee::EmployeeValidationError;
    use crate::query::filter::FilterError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_public_kinds() {
        let id = Uuid::nil();
        let not_found: DirectoryError = RepoError::NotFound {
            entity: "employee",
            id,
        }
        .into();
        assert_eq!(not_found.kind(), "not_found");
        assert!(not_found.to_string().contains(&id.to_string()));

        let conflict: DirectoryError = RepoError::Conflict {
            field: "email",
            value: "x@y.com".to_string(),
        }
        .into();
        assert_eq!(conflict.kind(), "conflict");
        assert_eq!(conflict.field(), Some("email"));

        let validation: DirectoryError =
            RepoError::Validation(EmployeeValidationError::new("age", "too young")).into();
        assert_eq!(validation.field(), Some("age"));

        let internal: DirectoryError = RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 2,
        })
        .into();
        assert_eq!(internal.kind(), "internal");
    }

    #[test]
    fn filter_errors_name_the_field() {
        let err: DirectoryError = FilterError::InvalidNumber {
            field: "minAge",
            value: "abc".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.field(), Some("minAge"));
    }
}
