//! User registration and profile lookups.
//!
//! # Responsibility
//! - Validate registration input above the repository layer.
//! - Keep the employee cache consistent with user links.
//!
//! # Invariants
//! - Only EMPLOYEE users may be linked to an employee record.
//! - Password hashes are produced and verified outside this crate.

use crate::cache::EmployeeCache;
use crate::model::employee::EmployeeId;
use crate::model::user::{Principal, Role, User, UserProfile, USERNAME_MAX_CHARS};
use crate::repo::user_repo::{NewUser, UserRepository};
use crate::service::error::{DirectoryError, DirectoryResult};
use log::{info, warn};
use std::sync::Arc;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_EMPLOYEE_USERNAME: &str = "employee";

pub struct UserService<U: UserRepository> {
    users: U,
    cache: Arc<EmployeeCache>,
}

impl<U: UserRepository> UserService<U> {
    /// `cache` must be the one shared with the employee directory.
    pub fn new(users: U, cache: Arc<EmployeeCache>) -> Self {
        Self { users, cache }
    }

    /// Registers a user, optionally linked to one employee record.
    pub fn register(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        employee_id: Option<EmployeeId>,
    ) -> DirectoryResult<UserProfile> {
        let username = normalize_username(username)?;
        if password_hash.trim().is_empty() {
            return Err(DirectoryError::validation("password", "is required"));
        }
        if role == Role::Admin && employee_id.is_some() {
            return Err(DirectoryError::validation(
                "employeeId",
                "only EMPLOYEE users can be linked to an employee",
            ));
        }

        let new_user = NewUser {
            username,
            password_hash: password_hash.to_string(),
            role,
            employee_id,
        };
        let result = match employee_id {
            // The cached aggregate carries the linked username.
            Some(id) => self.cache.with_key_lock(id, || -> DirectoryResult<User> {
                let user = self.users.create_user(&new_user)?;
                self.cache.evict(id);
                Ok(user)
            }),
            None => self.users.create_user(&new_user).map_err(DirectoryError::from),
        };

        match &result {
            Ok(user) => info!(
                "event=user_register module=user status=ok user_id={} role={} linked={}",
                user.id,
                user.role,
                user.employee_id.is_some()
            ),
            Err(err) => warn!(
                "event=user_register module=user status=rejected error_code={} role={role}",
                err.kind()
            ),
        }
        result.map(|user| UserProfile::from(&user))
    }

    /// Profile of the calling principal. Never includes credential data.
    pub fn profile(&self, principal: &Principal) -> DirectoryResult<UserProfile> {
        self.users
            .get_user_by_username(&principal.username)?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(|| DirectoryError::NotFound {
                entity: "user",
                key: principal.username.clone(),
            })
    }

    /// Full stored record, for credential checks by an outer layer.
    pub fn find_by_username(&self, username: &str) -> DirectoryResult<Option<User>> {
        Ok(self.users.get_user_by_username(username.trim())?)
    }

    pub fn linked_user(&self, employee_id: EmployeeId) -> DirectoryResult<Option<UserProfile>> {
        Ok(self
            .users
            .get_user_by_employee(employee_id)?
            .map(|user| UserProfile::from(&user)))
    }

    /// Seeds the default `admin` and `employee` accounts when missing.
    ///
    /// Returns how many accounts were created.
    pub fn ensure_default_users(
        &self,
        admin_password_hash: &str,
        employee_password_hash: &str,
    ) -> DirectoryResult<usize> {
        let defaults = [
            (DEFAULT_ADMIN_USERNAME, admin_password_hash, Role::Admin),
            (DEFAULT_EMPLOYEE_USERNAME, employee_password_hash, Role::Employee),
        ];
        let mut created = 0;
        for (username, password_hash, role) in defaults {
            if self.users.username_exists(username)? {
                continue;
            }
            self.register(username, password_hash, role, None)?;
            created += 1;
        }
        info!("event=seed_users module=user status=ok created={created}");
        Ok(created)
    }
}

fn normalize_username(value: &str) -> DirectoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::validation("username", "is required"));
    }
    if trimmed.chars().count() > USERNAME_MAX_CHARS {
        return Err(DirectoryError::validation(
            "username",
            format!("must not exceed {USERNAME_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_username;

    #[test]
    fn username_is_trimmed_and_bounded() {
        assert_eq!(normalize_username("  ann ").unwrap(), "ann");
        assert_eq!(normalize_username(" ").unwrap_err().field(), Some("username"));
        assert!(normalize_username(&"a".repeat(51)).is_err());
        assert!(normalize_username(&"a".repeat(50)).is_ok());
    }
}
