//! Employee directory use-case service.
//!
//! # Responsibility
//! - Expose get/list/create/update/delete/mark-attendance for one explicit
//!   principal per call.
//! - Compose filter compilation, access decisions, the read-through cache
//!   and the repository.
//!
//! # Invariants
//! - Single-record reads go through the cache; lists never do.
//! - Writes to one employee run inside that employee's cache key lock, and
//!   the cache entry is evicted only after the repository call succeeded.
//! - A failed write leaves the cache untouched.
//! - EMPLOYEE-role lists only ever contain the caller's own record.

use crate::access::{AccessGuard, Operation};
use crate::cache::EmployeeCache;
use crate::model::attendance::validate_attendance_date;
use crate::model::employee::{Employee, EmployeeId, EmployeeInput};
use crate::model::user::Principal;
use crate::query::filter::{compile_filter, EmployeeClause, EmployeeFilter};
use crate::query::page::{Page, PageInfo, PageRequest, SortSpec};
use crate::repo::employee_repo::EmployeeRepository;
use crate::repo::RepoError;
use crate::service::error::{DirectoryError, DirectoryResult};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Loosely-typed list parameters as received from an outer layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub filter: EmployeeFilter,
    pub page: i64,
    pub size: i64,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            filter: EmployeeFilter::default(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_dir: None,
        }
    }
}

impl ListRequest {
    pub fn new(filter: EmployeeFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: i64, size: i64) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_dir: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_dir = Some(sort_dir.into());
        self
    }
}

/// Authorization-aware employee directory.
pub struct EmployeeDirectory<R: EmployeeRepository> {
    repo: R,
    cache: Arc<EmployeeCache>,
    guard: AccessGuard,
    max_page_size: u32,
}

impl<R: EmployeeRepository> EmployeeDirectory<R> {
    /// Creates a directory with a private cache.
    pub fn new(repo: R) -> Self {
        Self::with_cache(repo, Arc::new(EmployeeCache::new()))
    }

    /// Creates a directory sharing `cache` with other services.
    pub fn with_cache(repo: R, cache: Arc<EmployeeCache>) -> Self {
        Self {
            repo,
            cache,
            guard: AccessGuard::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<EmployeeCache> {
        &self.cache
    }

    pub fn get_by_id(&self, id: EmployeeId, principal: &Principal) -> DirectoryResult<Employee> {
        let started_at = Instant::now();
        let result = self.load_cached(id).and_then(|employee| {
            self.guard.check(principal, Some(&employee), Operation::View)?;
            Ok(employee)
        });
        finish(Operation::View, Some(id), principal, started_at, result)
    }

    pub fn list(
        &self,
        request: &ListRequest,
        principal: &Principal,
    ) -> DirectoryResult<Page<Employee>> {
        let started_at = Instant::now();
        let result = self.list_inner(request, principal);
        if let Ok(page) = &result {
            debug!(
                "event=employee_list module=directory status=ok role={} returned={} total={}",
                principal.role,
                page.content.len(),
                page.page_info.total_elements
            );
        }
        finish(Operation::List, None, principal, started_at, result)
    }

    pub fn create(&self, input: &EmployeeInput, principal: &Principal) -> DirectoryResult<Employee> {
        let started_at = Instant::now();
        let result = self.create_inner(input, principal);
        let id = result.as_ref().ok().map(|employee| employee.id);
        finish(Operation::Create, id, principal, started_at, result)
    }

    /// Full replace of every mutable field.
    pub fn update(
        &self,
        id: EmployeeId,
        input: &EmployeeInput,
        principal: &Principal,
    ) -> DirectoryResult<Employee> {
        let started_at = Instant::now();
        let result = self.cache.with_key_lock(id, || -> DirectoryResult<Employee> {
            let current = self.load_unlocked(id)?;
            self.guard.check(principal, Some(&current), Operation::Update)?;
            let input = input.normalized();
            input.validate()?;
            let updated = self.repo.replace_employee(id, &input)?;
            self.cache.evict(id);
            Ok(updated)
        });
        finish(Operation::Update, Some(id), principal, started_at, result)
    }

    pub fn delete(&self, id: EmployeeId, principal: &Principal) -> DirectoryResult<()> {
        let started_at = Instant::now();
        let result = self
            .guard
            .check(principal, None, Operation::Delete)
            .map_err(DirectoryError::from)
            .and_then(|()| {
                self.cache.with_key_lock(id, || -> DirectoryResult<()> {
                    self.repo.delete_employee(id)?;
                    self.cache.evict(id);
                    Ok(())
                })
            });
        finish(Operation::Delete, Some(id), principal, started_at, result)
    }

    /// Upserts one `date -> present` entry in the employee's ledger.
    pub fn mark_attendance(
        &self,
        id: EmployeeId,
        date: &str,
        present: bool,
        principal: &Principal,
    ) -> DirectoryResult<Employee> {
        let started_at = Instant::now();
        let date = date.trim();
        let result = self.cache.with_key_lock(id, || -> DirectoryResult<Employee> {
            let current = self.load_unlocked(id)?;
            self.guard
                .check(principal, Some(&current), Operation::MarkAttendance)?;
            validate_attendance_date(date)?;
            let updated = self.repo.upsert_attendance(id, date, present)?;
            self.cache.evict(id);
            Ok(updated)
        });
        finish(Operation::MarkAttendance, Some(id), principal, started_at, result)
    }

    fn create_inner(
        &self,
        input: &EmployeeInput,
        principal: &Principal,
    ) -> DirectoryResult<Employee> {
        self.guard.check(principal, None, Operation::Create)?;
        let input = input.normalized();
        input.validate()?;
        let created = self.repo.create_employee(&input)?;
        self.cache.evict_all();
        Ok(created)
    }

    fn list_inner(
        &self,
        request: &ListRequest,
        principal: &Principal,
    ) -> DirectoryResult<Page<Employee>> {
        self.guard.check(principal, None, Operation::List)?;
        let page_request = self.page_request(request)?;
        let sort = SortSpec::parse(request.sort_by.as_deref(), request.sort_dir.as_deref())?;

        let mut predicate = compile_filter(&request.filter);
        if !principal.is_admin() {
            predicate = predicate.and(EmployeeClause::LinkedToUsername(
                principal.username.clone(),
            ));
        }

        let slice = self.repo.list_employees(&predicate, page_request, sort)?;
        Ok(Page {
            content: slice.items,
            page_info: PageInfo::new(page_request, slice.total),
        })
    }

    fn page_request(&self, request: &ListRequest) -> DirectoryResult<PageRequest> {
        let page = u32::try_from(request.page)
            .map_err(|_| DirectoryError::validation("page", "must be zero or greater"))?;
        let size = u32::try_from(request.size)
            .ok()
            .filter(|size| (1..=self.max_page_size).contains(size))
            .ok_or_else(|| {
                DirectoryError::validation(
                    "size",
                    format!("must be between 1 and {}", self.max_page_size),
                )
            })?;
        Ok(PageRequest { page, size })
    }

    fn load_cached(&self, id: EmployeeId) -> DirectoryResult<Employee> {
        if let Some(hit) = self.cache.get(id) {
            debug!("event=employee_cache module=directory status=hit employee_id={id}");
            return Ok(hit);
        }
        self.cache.with_key_lock(id, || self.load_unlocked(id))
    }

    /// Cache lookup then repository load. Caller holds the key lock.
    fn load_unlocked(&self, id: EmployeeId) -> DirectoryResult<Employee> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }
        debug!("event=employee_cache module=directory status=miss employee_id={id}");
        let loaded = self
            .repo
            .get_employee(id)?
            .ok_or(RepoError::NotFound {
                entity: "employee",
                id,
            })?;
        self.cache.put(loaded.clone());
        Ok(loaded)
    }
}

fn finish<T>(
    operation: Operation,
    id: Option<EmployeeId>,
    principal: &Principal,
    started_at: Instant,
    result: DirectoryResult<T>,
) -> DirectoryResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    let id = id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    match &result {
        Ok(_) if operation == Operation::View || operation == Operation::List => {}
        Ok(_) => info!(
            "event=employee_{operation} module=directory status=ok role={} employee_id={id} duration_ms={duration_ms}",
            principal.role
        ),
        Err(DirectoryError::AccessDenied(denied)) => warn!(
            "event=employee_{operation} module=directory status=denied role={} employee_id={id} reason={} duration_ms={duration_ms}",
            principal.role,
            denied.reason.as_str()
        ),
        Err(DirectoryError::Internal(message)) => error!(
            "event=employee_{operation} module=directory status=error error_code=internal employee_id={id} duration_ms={duration_ms} error={message}"
        ),
        Err(err) => info!(
            "event=employee_{operation} module=directory status=rejected error_code={} employee_id={id} duration_ms={duration_ms}",
            err.kind()
        ),
    }
    result
}
