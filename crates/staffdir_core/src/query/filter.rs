//! Employee filter compiler.
//!
//! A filter is a set of independently optional fields. Compilation consults a
//! fixed list of clause builders, one per field, and ANDs together the
//! clauses of the fields that are present. The resulting predicate can be
//! evaluated in-process ([`EmployeePredicate::matches`]) or rendered to SQL by
//! the repository so paging happens in storage.

use crate::model::employee::Employee;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Typed, sparse employee filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of `name`.
    pub name: Option<String>,
    /// Inclusive lower age bound.
    pub min_age: Option<u32>,
    /// Inclusive upper age bound.
    pub max_age: Option<u32>,
    /// Exact `class_name` match.
    pub class_name: Option<String>,
    /// Membership in `subjects`.
    pub subject: Option<String>,
}

/// Filter parse failure, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidNumber { field: &'static str, value: String },
    UnknownSortField(String),
}

impl FilterError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidNumber { field, .. } => field,
            Self::UnknownSortField(_) => "sortBy",
        }
    }
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { field, value } => {
                write!(f, "{field}: expected an integer, got `{value}`")
            }
            Self::UnknownSortField(value) => write!(
                f,
                "sortBy: unknown field `{value}`; expected id|name|age|className|email|createdAt|updatedAt"
            ),
        }
    }
}

impl Error for FilterError {}

impl EmployeeFilter {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_age_range(mut self, min_age: Option<u32>, max_age: Option<u32>) -> Self {
        self.min_age = min_age;
        self.max_age = max_age;
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Builds a filter from loosely-typed `(key, value)` pairs.
    ///
    /// Keys accept camelCase or snake_case. Age bounds must parse as
    /// integers; unknown keys are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            match key {
                "name" => filter.name = Some(value.to_string()),
                "minAge" | "min_age" => filter.min_age = Some(parse_age("minAge", value)?),
                "maxAge" | "max_age" => filter.max_age = Some(parse_age("maxAge", value)?),
                "className" | "class_name" => filter.class_name = Some(value.to_string()),
                "subject" => filter.subject = Some(value.to_string()),
                other => debug!("event=filter_parse module=query status=ignored key={other}"),
            }
        }
        Ok(filter)
    }
}

/// Any integer is accepted; out-of-range bounds clamp into `u32`, so a
/// negative `minAge` matches every age and a negative `maxAge` matches none.
fn parse_age(field: &'static str, value: &str) -> Result<u32, FilterError> {
    let parsed = value
        .trim()
        .parse::<i64>()
        .map_err(|_| FilterError::InvalidNumber {
            field,
            value: value.to_string(),
        })?;
    Ok(parsed.clamp(0, i64::from(u32::MAX)) as u32)
}

/// Case folding shared by the name filter and the stored `name_folded`
/// column. SQLite `LOWER` only folds ASCII, so folding happens here.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// One predicate term over the employee entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeClause {
    /// Lowercased needle.
    NameContains(String),
    MinAge(u32),
    MaxAge(u32),
    ClassNameEquals(String),
    HasSubject(String),
    /// Restricts rows to the employee linked to this username.
    LinkedToUsername(String),
}

impl EmployeeClause {
    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            Self::NameContains(needle) => fold_name(&employee.name).contains(needle.as_str()),
            Self::MinAge(min) => employee.age >= *min,
            Self::MaxAge(max) => employee.age <= *max,
            Self::ClassNameEquals(class_name) => &employee.class_name == class_name,
            Self::HasSubject(subject) => employee.subjects.iter().any(|s| s == subject),
            Self::LinkedToUsername(username) => employee.is_linked_to(username),
        }
    }
}

/// Conjunction of clauses. No clauses means every record matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeePredicate {
    clauses: Vec<EmployeeClause>,
}

impl EmployeePredicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: EmployeeClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn is_universal(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[EmployeeClause] {
        &self.clauses
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.clauses.iter().all(|clause| clause.matches(employee))
    }
}

type ClauseBuilder = fn(&EmployeeFilter) -> Option<EmployeeClause>;

const CLAUSE_BUILDERS: &[ClauseBuilder] = &[
    name_clause,
    min_age_clause,
    max_age_clause,
    class_name_clause,
    subject_clause,
];

/// Compiles `filter` into the AND of the clauses of its present fields.
pub fn compile_filter(filter: &EmployeeFilter) -> EmployeePredicate {
    CLAUSE_BUILDERS
        .iter()
        .filter_map(|build| build(filter))
        .fold(EmployeePredicate::all(), EmployeePredicate::and)
}

fn name_clause(filter: &EmployeeFilter) -> Option<EmployeeClause> {
    // A blank needle matches every name, same as no clause.
    let needle = fold_name(filter.name.as_deref()?.trim());
    (!needle.is_empty()).then_some(EmployeeClause::NameContains(needle))
}

fn min_age_clause(filter: &EmployeeFilter) -> Option<EmployeeClause> {
    filter.min_age.map(EmployeeClause::MinAge)
}

fn max_age_clause(filter: &EmployeeFilter) -> Option<EmployeeClause> {
    filter.max_age.map(EmployeeClause::MaxAge)
}

fn class_name_clause(filter: &EmployeeFilter) -> Option<EmployeeClause> {
    filter
        .class_name
        .clone()
        .map(EmployeeClause::ClassNameEquals)
}

fn subject_clause(filter: &EmployeeFilter) -> Option<EmployeeClause> {
    filter.subject.clone().map(EmployeeClause::HasSubject)
}
