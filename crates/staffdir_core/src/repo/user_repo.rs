//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - `username` is unique; duplicates surface as a conflict on `username`.
//! - One user per employee; a second link surfaces as a conflict on
//!   `employeeId`.
//! - Users are never updated or deleted here.

use super::{ensure_schema_ready, map_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::db::SharedConnection;
use crate::model::employee::EmployeeId;
use crate::model::now_epoch_ms;
use crate::model::user::{parse_role, Role, User};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    username,
    password_hash,
    role,
    employee_uuid,
    created_at
FROM users";

/// Write model for user registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    /// Opaque hash produced by the caller's password encoder.
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

pub trait UserRepository: Send + Sync {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn get_user_by_employee(&self, employee_id: EmployeeId) -> RepoResult<Option<User>>;
    fn username_exists(&self, username: &str) -> RepoResult<bool>;
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    conn: SharedConnection,
}

impl SqliteUserRepository {
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_schema_ready(&conn.lock(), &["users", "employees"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::now_v7();
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if username_taken(&tx, &user.username)? {
            return Err(RepoError::Conflict {
                field: "username",
                value: user.username.clone(),
            });
        }

        if let Some(employee_id) = user.employee_id {
            let employee_text = employee_id.to_string();
            let employee_exists: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM employees WHERE uuid = ?1);",
                [employee_text.as_str()],
                |row| row.get(0),
            )?;
            if employee_exists != 1 {
                return Err(RepoError::NotFound {
                    entity: "employee",
                    id: employee_id,
                });
            }
            let already_linked: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE employee_uuid = ?1);",
                [employee_text.as_str()],
                |row| row.get(0),
            )?;
            if already_linked == 1 {
                return Err(RepoError::Conflict {
                    field: "employeeId",
                    value: employee_text,
                });
            }
        }

        tx.execute(
            "INSERT INTO users (
                uuid,
                username,
                password_hash,
                role,
                employee_uuid,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                user.username.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
                user.employee_id.map(|value| value.to_string()),
                now_epoch_ms(),
            ],
        )
        .map_err(|err| map_unique_violation(err, "users.username", "username", &user.username))?;

        let created = load_user(&tx, "uuid", &id.to_string())?
            .ok_or_else(|| RepoError::InvalidData(format!("user {id} missing after insert")))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        load_user(&self.conn.lock(), "username", username)
    }

    fn get_user_by_employee(&self, employee_id: EmployeeId) -> RepoResult<Option<User>> {
        load_user(&self.conn.lock(), "employee_uuid", &employee_id.to_string())
    }

    fn username_exists(&self, username: &str) -> RepoResult<bool> {
        username_taken(&self.conn.lock(), username)
    }
}

fn username_taken(conn: &Connection, username: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1);",
        [username],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// `column` is always one of the crate's own literals.
fn load_user(conn: &Connection, column: &'static str, value: &str) -> RepoResult<Option<User>> {
    conn.query_row(
        &format!("{USER_SELECT_SQL} WHERE {column} = ?1;"),
        [value],
        |row| Ok(parse_user_row(row)),
    )
    .optional()?
    .transpose()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;
    let employee_id = match row.get::<_, Option<String>>("employee_uuid")? {
        Some(value) => Some(parse_uuid(&value, "users.employee_uuid")?),
        None => None,
    };

    Ok(User {
        id: parse_uuid(&uuid_text, "users.uuid")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        role,
        employee_id,
        created_at: row.get("created_at")?,
    })
}
