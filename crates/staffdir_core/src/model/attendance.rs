//! Attendance ledger embedded in every employee aggregate.
//!
//! # Invariants
//! - Dates are unique keys; marking an existing date overwrites its value.
//! - The record view carries no ordering guarantee.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::employee::EmployeeValidationError;

static ATTENDANCE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("valid attendance date regex")
});

/// One `(date, present)` pair as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: String,
    pub present: bool,
}

/// Keyed presence map, serialized as a list of [`AttendanceRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AttendanceRecord>", into = "Vec<AttendanceRecord>")]
pub struct AttendanceLedger {
    entries: HashMap<String, bool>,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts one date. Returns the previous value for that date, if any.
    pub fn mark(&mut self, date: impl Into<String>, present: bool) -> Option<bool> {
        self.entries.insert(date.into(), present)
    }

    pub fn get(&self, date: &str) -> Option<bool> {
        self.entries.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derives the record view. Order is unspecified.
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.entries
            .iter()
            .map(|(date, present)| AttendanceRecord {
                date: date.clone(),
                present: *present,
            })
            .collect()
    }
}

impl From<Vec<AttendanceRecord>> for AttendanceLedger {
    fn from(records: Vec<AttendanceRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.mark(record.date, record.present);
        }
        ledger
    }
}

impl From<AttendanceLedger> for Vec<AttendanceRecord> {
    fn from(ledger: AttendanceLedger) -> Self {
        ledger.records()
    }
}

impl FromIterator<(String, bool)> for AttendanceLedger {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Checks that `date` is a `YYYY-MM-DD` calendar date string.
pub fn validate_attendance_date(date: &str) -> Result<(), EmployeeValidationError> {
    let invalid = || EmployeeValidationError::new("date", "must be a YYYY-MM-DD calendar date");
    let caps = ATTENDANCE_DATE_RE.captures(date).ok_or_else(invalid)?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    Ok(())
}
