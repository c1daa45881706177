use staffdir_core::db::{open_db_in_memory, SharedConnection};
use staffdir_core::{
    DirectoryError, EmployeeDirectory, EmployeeInput, Principal, SqliteEmployeeRepository,
};
use std::collections::HashSet;
use uuid::Uuid;

fn directory() -> EmployeeDirectory<SqliteEmployeeRepository> {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    EmployeeDirectory::new(SqliteEmployeeRepository::try_new(conn).unwrap())
}

fn admin() -> Principal {
    Principal::admin("admin")
}

fn ann() -> EmployeeInput {
    EmployeeInput::new("Ann", 25, "10A", vec!["Math".to_string()])
}

#[test]
fn create_then_get_returns_input_fields_and_empty_ledger() {
    let directory = directory();
    let input = ann()
        .with_email("ann@example.com")
        .with_phone("0123456789");

    let created = directory.create(&input, &admin()).unwrap();
    let loaded = directory.get_by_id(created.id, &admin()).unwrap();

    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.name, input.name);
    assert_eq!(loaded.age, input.age);
    assert_eq!(loaded.class_name, input.class_name);
    assert_eq!(loaded.subjects, input.subjects);
    assert_eq!(loaded.email, input.email);
    assert_eq!(loaded.phone, input.phone);
    assert!(loaded.attendance.is_empty());
    assert!(loaded.created_at > 0);
}

#[test]
fn create_normalizes_text_fields() {
    let directory = directory();
    let input = EmployeeInput::new("  Ann ", 25, " 10A ", vec![" Math ".to_string()]).with_email("  ");

    let created = directory.create(&input, &admin()).unwrap();
    assert_eq!(created.name, "Ann");
    assert_eq!(created.class_name, "10A");
    assert_eq!(created.subjects, vec!["Math"]);
    assert_eq!(created.email, None);
}

#[test]
fn create_reports_offending_field() {
    let directory = directory();
    let err = directory
        .create(&ann().with_email("not-an-email"), &admin())
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(err.field(), Some("email"));
}

#[test]
fn duplicate_email_on_create_is_a_conflict() {
    let directory = directory();
    directory
        .create(&ann().with_email("x@y.com"), &admin())
        .unwrap();

    let second = EmployeeInput::new("Bob", 30, "10B", vec!["Art".to_string()]).with_email("x@y.com");
    let err = directory.create(&second, &admin()).unwrap_err();
    match err {
        DirectoryError::Conflict { field, value } => {
            assert_eq!(field, "email");
            assert_eq!(value, "x@y.com");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_is_a_full_replace() {
    let directory = directory();
    let created = directory
        .create(&ann().with_email("ann@example.com").with_phone("0123456789"), &admin())
        .unwrap();

    let replacement = EmployeeInput::new("Ann Lee", 26, "11B", vec!["Art".to_string(), "Math".to_string()]);
    let updated = directory.update(created.id, &replacement, &admin()).unwrap();

    assert_eq!(updated.name, "Ann Lee");
    assert_eq!(updated.subjects, vec!["Art", "Math"]);
    assert_eq!(updated.email, None);
    assert_eq!(updated.phone, None);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(directory.get_by_id(created.id, &admin()).unwrap(), updated);
}

#[test]
fn duplicate_email_on_update_is_a_conflict() {
    let directory = directory();
    directory.create(&ann().with_email("x@y.com"), &admin()).unwrap();
    let bob = directory
        .create(&EmployeeInput::new("Bob", 30, "10B", vec!["Art".to_string()]), &admin())
        .unwrap();

    let err = directory
        .update(
            bob.id,
            &EmployeeInput::new("Bob", 30, "10B", vec!["Art".to_string()]).with_email("x@y.com"),
            &admin(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "conflict");
}

#[test]
fn delete_then_get_is_not_found_and_never_cached() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();
    directory.get_by_id(created.id, &admin()).unwrap();
    assert!(directory.cache().contains(created.id));

    directory.delete(created.id, &admin()).unwrap();
    assert!(!directory.cache().contains(created.id));

    for _ in 0..2 {
        let err = directory.get_by_id(created.id, &admin()).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }
    assert!(!directory.cache().contains(created.id));
}

#[test]
fn operations_on_missing_ids_are_not_found() {
    let directory = directory();
    let id = Uuid::now_v7();

    assert!(directory.get_by_id(id, &admin()).unwrap_err().is_not_found());
    assert!(directory.update(id, &ann(), &admin()).unwrap_err().is_not_found());
    assert!(directory.delete(id, &admin()).unwrap_err().is_not_found());
    assert!(directory
        .mark_attendance(id, "2024-01-01", true, &admin())
        .unwrap_err()
        .is_not_found());
}

#[test]
fn mark_attendance_is_last_write_wins_per_date() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();

    directory
        .mark_attendance(created.id, "2024-01-01", true, &admin())
        .unwrap();
    let updated = directory
        .mark_attendance(created.id, "2024-01-01", false, &admin())
        .unwrap();

    assert_eq!(updated.attendance.len(), 1);
    assert_eq!(updated.attendance.get("2024-01-01"), Some(false));
    assert!(updated.updated_at > created.updated_at);
}

#[test]
fn repeated_mark_is_idempotent_in_effect() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();

    let first = directory
        .mark_attendance(created.id, "2024-03-04", true, &admin())
        .unwrap();
    let second = directory
        .mark_attendance(created.id, "2024-03-04", true, &admin())
        .unwrap();
    assert_eq!(first.attendance, second.attendance);

    let pairs: HashSet<_> = second
        .attendance
        .records()
        .into_iter()
        .map(|record| (record.date, record.present))
        .collect();
    assert_eq!(pairs, HashSet::from([("2024-03-04".to_string(), true)]));
}

#[test]
fn mark_attendance_rejects_malformed_dates() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();

    for date in ["2024-13-01", "01/02/2024", "", "2024-1-1", "٢٠٢٤-01-01"] {
        let err = directory
            .mark_attendance(created.id, date, true, &admin())
            .unwrap_err();
        assert_eq!(err.field(), Some("date"), "date={date:?}");
    }
}

#[test]
fn mark_attendance_evicts_cached_copy() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();
    directory.get_by_id(created.id, &admin()).unwrap();

    directory
        .mark_attendance(created.id, "2024-01-05", true, &admin())
        .unwrap();
    assert!(!directory.cache().contains(created.id));
    let reloaded = directory.get_by_id(created.id, &admin()).unwrap();
    assert_eq!(reloaded.attendance.get("2024-01-05"), Some(true));
}

#[test]
fn create_evicts_entire_cache() {
    let directory = directory();
    let first = directory.create(&ann(), &admin()).unwrap();
    directory.get_by_id(first.id, &admin()).unwrap();
    assert_eq!(directory.cache().len(), 1);

    directory
        .create(&EmployeeInput::new("Bob", 30, "10B", vec!["Art".to_string()]), &admin())
        .unwrap();
    assert!(directory.cache().is_empty());
}

#[test]
fn employee_serializes_without_link_metadata() {
    let directory = directory();
    let created = directory.create(&ann(), &admin()).unwrap();
    let json = serde_json::to_value(&created).unwrap();

    assert_eq!(json["className"], "10A");
    assert_eq!(json["attendance"], serde_json::json!([]));
    assert!(json.get("linkedUsername").is_none());
}
