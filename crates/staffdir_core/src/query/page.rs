//! Paging and sorting request/response shapes.

use super::filter::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Sortable employee columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Age,
    ClassName,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Parses camelCase or snake_case field names. Unknown names return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "age" => Some(Self::Age),
            "className" | "class_name" => Some(Self::ClassName),
            "email" => Some(Self::Email),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Age => "age",
            Self::ClassName => "className",
            Self::Email => "email",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `DESC` (any case) sorts descending; anything else sorts ascending.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Resolves loosely-typed sort parameters.
    ///
    /// A missing or blank field sorts by `id`; an unknown field is rejected.
    /// The direction is parsed leniently.
    pub fn parse(sort_by: Option<&str>, sort_dir: Option<&str>) -> Result<Self, FilterError> {
        let field = match sort_by.map(str::trim).filter(|value| !value.is_empty()) {
            None => SortField::default(),
            Some(value) => SortField::parse(value)
                .ok_or_else(|| FilterError::UnknownSortField(value.to_string()))?,
        };
        Ok(Self {
            field,
            direction: sort_dir
                .map(SortDirection::parse_lenient)
                .unwrap_or_default(),
        })
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.direction.as_sql())
    }
}

/// Zero-based page window. `size` is always positive once constructed by the
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// Pagination metadata derived from one page request and a total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    pub fn new(request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = u32::try_from(total_elements.div_ceil(size)).unwrap_or(u32::MAX);
        Self {
            page_number: request.page,
            page_size: request.size,
            total_elements,
            total_pages,
            has_next: request.page.saturating_add(1) < total_pages,
            has_previous: request.page > 0,
        }
    }
}

/// One page of results plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_info: PageInfo,
}
