//! Employee aggregate and its write input.
//!
//! # Responsibility
//! - Define the canonical employee record returned by the directory.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `updated_at` is refreshed by every mutation, including attendance marks.
//! - `email`, when present, is unique across all employees (enforced by
//!   storage, surfaced as a conflict).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::attendance::AttendanceLedger;

/// Stable employee identifier, assigned on creation.
pub type EmployeeId = Uuid;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const AGE_MIN: u32 = 18;
pub const AGE_MAX: u32 = 100;
pub const CLASS_NAME_MAX_CHARS: usize = 50;
pub const SUBJECTS_MIN: usize = 1;
pub const SUBJECTS_MAX: usize = 20;
pub const EMAIL_MAX_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*$")
        .expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10,15}$").expect("valid phone regex"));

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeValidationError {
    /// Offending field, using external (camelCase) naming.
    pub field: &'static str,
    pub message: String,
}

impl EmployeeValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for EmployeeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Error for EmployeeValidationError {}

/// Mutable employee fields supplied on create and update.
///
/// Update uses full-replace semantics: every field here overwrites the stored
/// value, including clearing `email`/`phone` when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub name: String,
    pub age: u32,
    pub class_name: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl EmployeeInput {
    pub fn new(
        name: impl Into<String>,
        age: u32,
        class_name: impl Into<String>,
        subjects: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age,
            class_name: class_name.into(),
            subjects,
            email: None,
            phone: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Returns a copy with blank optional fields collapsed to `None` and
    /// surrounding whitespace removed from text fields.
    pub fn normalized(&self) -> Self {
        let trim_optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            name: self.name.trim().to_string(),
            age: self.age,
            class_name: self.class_name.trim().to_string(),
            subjects: self
                .subjects
                .iter()
                .map(|subject| subject.trim().to_string())
                .collect(),
            email: trim_optional(&self.email),
            phone: trim_optional(&self.phone),
        }
    }

    /// Validates field constraints. Reports the first failing field.
    pub fn validate(&self) -> Result<(), EmployeeValidationError> {
        let name_chars = self.name.trim().chars().count();
        if name_chars == 0 {
            return Err(EmployeeValidationError::new("name", "is required"));
        }
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_chars) {
            return Err(EmployeeValidationError::new(
                "name",
                format!("must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"),
            ));
        }

        if !(AGE_MIN..=AGE_MAX).contains(&self.age) {
            return Err(EmployeeValidationError::new(
                "age",
                format!("must be between {AGE_MIN} and {AGE_MAX}"),
            ));
        }

        let class_chars = self.class_name.trim().chars().count();
        if class_chars == 0 {
            return Err(EmployeeValidationError::new("className", "is required"));
        }
        if class_chars > CLASS_NAME_MAX_CHARS {
            return Err(EmployeeValidationError::new(
                "className",
                format!("must not exceed {CLASS_NAME_MAX_CHARS} characters"),
            ));
        }

        if !(SUBJECTS_MIN..=SUBJECTS_MAX).contains(&self.subjects.len()) {
            return Err(EmployeeValidationError::new(
                "subjects",
                format!("must contain between {SUBJECTS_MIN} and {SUBJECTS_MAX} entries"),
            ));
        }
        if self.subjects.iter().any(|subject| subject.trim().is_empty()) {
            return Err(EmployeeValidationError::new(
                "subjects",
                "entries must not be blank",
            ));
        }

        if let Some(email) = self.email.as_deref() {
            if email.chars().count() > EMAIL_MAX_CHARS {
                return Err(EmployeeValidationError::new(
                    "email",
                    format!("must not exceed {EMAIL_MAX_CHARS} characters"),
                ));
            }
            if !EMAIL_RE.is_match(email) {
                return Err(EmployeeValidationError::new("email", "invalid email format"));
            }
        }

        if let Some(phone) = self.phone.as_deref() {
            if !PHONE_RE.is_match(phone) {
                return Err(EmployeeValidationError::new(
                    "phone",
                    "must be 10-15 digits",
                ));
            }
        }

        Ok(())
    }
}

/// Employee aggregate: scalar fields plus the embedded attendance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub age: u32,
    pub class_name: String,
    pub subjects: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub attendance: AttendanceLedger,
    /// Username of the linked user, if any. Used for ownership checks only.
    #[serde(default, skip_serializing)]
    pub linked_username: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Employee {
    /// Builds a fresh aggregate from validated input.
    pub fn from_input(id: EmployeeId, input: &EmployeeInput, now_ms: i64) -> Self {
        Self {
            id,
            name: input.name.clone(),
            age: input.age,
            class_name: input.class_name.clone(),
            subjects: input.subjects.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            attendance: AttendanceLedger::new(),
            linked_username: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Whether `username` owns this record through the user link.
    pub fn is_linked_to(&self, username: &str) -> bool {
        self.linked_username.as_deref() == Some(username)
    }
}

#[cfg(test)]
mod tests {
    use super::EmployeeInput;

    fn valid_input() -> EmployeeInput {
        EmployeeInput::new("Ann", 25, "10A", vec!["Math".to_string()])
    }

    #[test]
    fn accepts_minimal_valid_input() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn reports_offending_field() {
        let cases: Vec<(EmployeeInput, &str)> = vec![
            (EmployeeInput { name: " ".into(), ..valid_input() }, "name"),
            (EmployeeInput { name: "A".into(), ..valid_input() }, "name"),
            (EmployeeInput { age: 17, ..valid_input() }, "age"),
            (EmployeeInput { age: 101, ..valid_input() }, "age"),
            (EmployeeInput { class_name: "".into(), ..valid_input() }, "className"),
            (EmployeeInput { class_name: "x".repeat(51), ..valid_input() }, "className"),
            (EmployeeInput { subjects: vec![], ..valid_input() }, "subjects"),
            (EmployeeInput { subjects: vec!["  ".into()], ..valid_input() }, "subjects"),
            (valid_input().with_email("not-an-email"), "email"),
            (valid_input().with_phone("12345"), "phone"),
            (valid_input().with_phone("12345abcde"), "phone"),
        ];
        for (input, field) in cases {
            let err = input.validate().expect_err("input should be rejected");
            assert_eq!(err.field, field, "{err}");
        }
    }

    #[test]
    fn subject_count_is_capped_at_twenty() {
        let subjects = (0..21).map(|index| format!("s{index}")).collect();
        let err = EmployeeInput { subjects, ..valid_input() }
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "subjects");
    }

    #[test]
    fn normalized_collapses_blank_optionals() {
        let input = valid_input().with_email("   ").with_phone(" 0123456789 ");
        let normalized = input.normalized();
        assert_eq!(normalized.email, None);
        assert_eq!(normalized.phone.as_deref(), Some("0123456789"));
        assert!(normalized.validate().is_ok());
    }
}
