//! Employee repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the employee aggregate across `employees`, `employee_subjects`
//!   and `employee_attendance`.
//! - Render compiled filter predicates to a parameterized WHERE clause so
//!   paging and counting happen in storage.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Attendance writes merge one date key; they never rewrite the ledger.
//! - `updated_at` strictly increases on every successful mutation.
//! - `name_folded` is rewritten together with `name`.

use super::{
    ensure_schema_ready, map_unique_violation, parse_uuid, RepoError, RepoResult,
};
use crate::db::SharedConnection;
use crate::model::attendance::AttendanceLedger;
use crate::model::employee::{Employee, EmployeeId, EmployeeInput};
use crate::model::now_epoch_ms;
use crate::query::filter::{fold_name, EmployeeClause, EmployeePredicate};
use crate::query::page::{PageRequest, SortField, SortSpec};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use uuid::Uuid;

const ENTITY: &str = "employee";

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    e.uuid,
    e.name,
    e.age,
    e.class_name,
    e.email,
    e.phone,
    e.created_at,
    e.updated_at,
    (SELECT u.username FROM users u WHERE u.employee_uuid = e.uuid) AS linked_username
FROM employees e";

/// One page of employees plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeSlice {
    pub items: Vec<Employee>,
    pub total: u64,
}

/// Persistence contract consumed by the directory service.
pub trait EmployeeRepository: Send + Sync {
    /// Inserts a new aggregate with generated id and timestamps.
    fn create_employee(&self, input: &EmployeeInput) -> RepoResult<Employee>;
    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>>;
    /// Returns one page of rows matching `predicate`, ordered by `sort`.
    fn list_employees(
        &self,
        predicate: &EmployeePredicate,
        page: PageRequest,
        sort: SortSpec,
    ) -> RepoResult<EmployeeSlice>;
    fn count_employees(&self) -> RepoResult<u64>;
    /// Replaces every mutable field. Attendance and timestamps are kept,
    /// except `updated_at`.
    fn replace_employee(&self, id: EmployeeId, input: &EmployeeInput) -> RepoResult<Employee>;
    /// Inserts or overwrites one attendance date.
    fn upsert_attendance(&self, id: EmployeeId, date: &str, present: bool)
        -> RepoResult<Employee>;
    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()>;
}

/// SQLite-backed employee repository.
#[derive(Clone)]
pub struct SqliteEmployeeRepository {
    conn: SharedConnection,
}

impl SqliteEmployeeRepository {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_schema_ready(
            &conn.lock(),
            &["employees", "employee_subjects", "employee_attendance", "users"],
        )?;
        Ok(Self { conn })
    }
}

impl EmployeeRepository for SqliteEmployeeRepository {
    fn create_employee(&self, input: &EmployeeInput) -> RepoResult<Employee> {
        input.validate()?;
        let id = Uuid::now_v7();
        let now = now_epoch_ms();

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(email) = input.email.as_deref() {
            ensure_email_available(&tx, email, None)?;
        }

        tx.execute(
            "INSERT INTO employees (
                uuid,
                name,
                name_folded,
                age,
                class_name,
                email,
                phone,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?8, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                input.name.as_str(),
                input.age,
                input.class_name.as_str(),
                input.email.as_deref(),
                input.phone.as_deref(),
                now,
                fold_name(&input.name),
            ],
        )
        .map_err(|err| email_conflict(err, input))?;
        write_subjects(&tx, id, &input.subjects)?;

        let created = load_employee(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("employee {id} missing after insert"))
        })?;
        tx.commit()?;
        Ok(created)
    }

    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        load_employee(&self.conn.lock(), id)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE e.email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_employee_row(&conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_employees(
        &self,
        predicate: &EmployeePredicate,
        page: PageRequest,
        sort: SortSpec,
    ) -> RepoResult<EmployeeSlice> {
        let (where_sql, mut bind_values) = render_predicate(predicate);
        let conn = self.conn.lock();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM employees e{where_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{EMPLOYEE_SELECT_SQL}{where_sql} ORDER BY {} {}, e.uuid ASC LIMIT ? OFFSET ?;",
            sort_column(sort.field),
            sort.direction.as_sql()
        );
        bind_values.push(Value::Integer(i64::from(page.size)));
        bind_values.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_employee_row(&conn, row)?);
        }

        Ok(EmployeeSlice {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    fn count_employees(&self) -> RepoResult<u64> {
        let total: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM employees;", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    fn replace_employee(&self, id: EmployeeId, input: &EmployeeInput) -> RepoResult<Employee> {
        input.validate()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(email) = input.email.as_deref() {
            ensure_email_available(&tx, email, Some(id))?;
        }

        let changed = tx
            .execute(
                "UPDATE employees
                 SET
                    name = ?2,
                    name_folded = ?8,
                    age = ?3,
                    class_name = ?4,
                    email = ?5,
                    phone = ?6,
                    updated_at = MAX(?7, updated_at + 1)
                 WHERE uuid = ?1;",
                params![
                    id.to_string(),
                    input.name.as_str(),
                    input.age,
                    input.class_name.as_str(),
                    input.email.as_deref(),
                    input.phone.as_deref(),
                    now_epoch_ms(),
                    fold_name(&input.name),
                ],
            )
            .map_err(|err| email_conflict(err, input))?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }

        tx.execute(
            "DELETE FROM employee_subjects WHERE employee_uuid = ?1;",
            [id.to_string()],
        )?;
        write_subjects(&tx, id, &input.subjects)?;

        let updated = load_employee(&tx, id)?.ok_or(RepoError::NotFound { entity: ENTITY, id })?;
        tx.commit()?;
        Ok(updated)
    }

    fn upsert_attendance(
        &self,
        id: EmployeeId,
        date: &str,
        present: bool,
    ) -> RepoResult<Employee> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE employees
             SET updated_at = MAX(?2, updated_at + 1)
             WHERE uuid = ?1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }

        tx.execute(
            "INSERT INTO employee_attendance (employee_uuid, attendance_date, present)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(employee_uuid, attendance_date)
             DO UPDATE SET present = excluded.present;",
            params![id.to_string(), date, present],
        )?;

        let updated = load_employee(&tx, id)?.ok_or(RepoError::NotFound { entity: ENTITY, id })?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM employees WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }
        tx.commit()?;
        Ok(())
    }
}

fn render_predicate(predicate: &EmployeePredicate) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values = Vec::with_capacity(predicate.clauses().len());
    for clause in predicate.clauses() {
        let (fragment, value) = render_clause(clause);
        sql.push_str(" AND ");
        sql.push_str(fragment);
        bind_values.push(value);
    }
    (sql, bind_values)
}

fn render_clause(clause: &EmployeeClause) -> (&'static str, Value) {
    match clause {
        EmployeeClause::NameContains(needle) => (
            "e.name_folded LIKE ? ESCAPE '\\'",
            Value::Text(format!("%{}%", escape_like(needle))),
        ),
        EmployeeClause::MinAge(min) => ("e.age >= ?", Value::Integer(i64::from(*min))),
        EmployeeClause::MaxAge(max) => ("e.age <= ?", Value::Integer(i64::from(*max))),
        EmployeeClause::ClassNameEquals(class_name) => {
            ("e.class_name = ?", Value::Text(class_name.clone()))
        }
        EmployeeClause::HasSubject(subject) => (
            "EXISTS (
                SELECT 1 FROM employee_subjects s
                WHERE s.employee_uuid = e.uuid AND s.subject = ?
            )",
            Value::Text(subject.clone()),
        ),
        EmployeeClause::LinkedToUsername(username) => (
            "EXISTS (
                SELECT 1 FROM users u
                WHERE u.employee_uuid = e.uuid AND u.username = ?
            )",
            Value::Text(username.clone()),
        ),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Id => "e.uuid",
        SortField::Name => "e.name",
        SortField::Age => "e.age",
        SortField::ClassName => "e.class_name",
        SortField::Email => "e.email",
        SortField::CreatedAt => "e.created_at",
        SortField::UpdatedAt => "e.updated_at",
    }
}

fn email_conflict(err: rusqlite::Error, input: &EmployeeInput) -> RepoError {
    let email = input.email.as_deref().unwrap_or_default();
    map_unique_violation(err, "employees.email", "email", email)
}

fn ensure_email_available(
    conn: &Connection,
    email: &str,
    exclude: Option<EmployeeId>,
) -> RepoResult<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT uuid FROM employees WHERE email = ?1 LIMIT 1;",
            [email],
            |row| row.get(0),
        )
        .optional()?;

    let excluded = exclude.map(|id| id.to_string());
    match owner {
        Some(owner) if excluded.as_deref() != Some(owner.as_str()) => {
            Err(RepoError::Conflict {
                field: "email",
                value: email.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn write_subjects(conn: &Connection, id: EmployeeId, subjects: &[String]) -> RepoResult<()> {
    let id_text = id.to_string();
    let mut stmt = conn.prepare(
        "INSERT INTO employee_subjects (employee_uuid, position, subject)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, subject) in subjects.iter().enumerate() {
        stmt.execute(params![id_text.as_str(), position as i64, subject.as_str()])?;
    }
    Ok(())
}

fn load_employee(conn: &Connection, id: EmployeeId) -> RepoResult<Option<Employee>> {
    let mut stmt = conn.prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE e.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_employee_row(conn, row)?)),
        None => Ok(None),
    }
}

fn parse_employee_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Employee> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "employees.uuid")?;

    let raw_age: i64 = row.get("age")?;
    let age = u32::try_from(raw_age).map_err(|_| {
        RepoError::InvalidData(format!("invalid age `{raw_age}` in employees.age"))
    })?;

    Ok(Employee {
        id,
        name: row.get("name")?,
        age,
        class_name: row.get("class_name")?,
        subjects: load_subjects(conn, &uuid_text)?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        attendance: load_attendance(conn, &uuid_text)?,
        linked_username: row.get("linked_username")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_subjects(conn: &Connection, employee_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT subject
         FROM employee_subjects
         WHERE employee_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([employee_uuid])?;
    let mut subjects = Vec::new();
    while let Some(row) = rows.next()? {
        subjects.push(row.get(0)?);
    }
    Ok(subjects)
}

fn load_attendance(conn: &Connection, employee_uuid: &str) -> RepoResult<AttendanceLedger> {
    let mut stmt = conn.prepare(
        "SELECT attendance_date, present
         FROM employee_attendance
         WHERE employee_uuid = ?1;",
    )?;
    let mut rows = stmt.query([employee_uuid])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let date: String = row.get(0)?;
        let present = match row.get::<_, i64>(1)? {
            0 => false,
            1 => true,
            other => {
                return Err(RepoError::InvalidData(format!(
                    "invalid present value `{other}` in employee_attendance.present"
                )));
            }
        };
        entries.push((date, present));
    }
    Ok(entries.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::{escape_like, render_predicate};
    use crate::query::filter::{EmployeeClause, EmployeePredicate};
    use rusqlite::types::Value;

    #[test]
    fn universal_predicate_renders_tautology() {
        let (sql, values) = render_predicate(&EmployeePredicate::all());
        assert_eq!(sql, " WHERE 1 = 1");
        assert!(values.is_empty());
    }

    #[test]
    fn clauses_render_in_order_with_bound_values() {
        let predicate = EmployeePredicate::all()
            .and(EmployeeClause::MinAge(20))
            .and(EmployeeClause::ClassNameEquals("10A".to_string()));
        let (sql, values) = render_predicate(&predicate);
        assert!(sql.contains("e.age >= ? AND e.class_name = ?"));
        assert_eq!(
            values,
            vec![Value::Integer(20), Value::Text("10A".to_string())]
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }
}
