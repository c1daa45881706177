//! CLI bootstrap entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and open (and migrate) the database.
//! - Seed default accounts when asked to, from environment-supplied hashes.
//! - Print a deterministic status summary for local sanity checks.

use log::{error, info, warn};
use staffdir_core::config::{ENV_SEED_ADMIN_HASH, ENV_SEED_EMPLOYEE_HASH};
use staffdir_core::{
    init_logging, open_db, EmployeeCache, EmployeeDirectory, EmployeeFilter, EmployeeRepository,
    ListRequest, Principal, SharedConnection, SqliteEmployeeRepository, SqliteUserRepository,
    StaffdirConfig, UserService,
};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("staffdir: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = StaffdirConfig::from_env()?;
    init_logging(&config.logging())?;

    let conn = SharedConnection::new(open_db(&config.db_path)?);
    let cache = Arc::new(EmployeeCache::new());
    let employees = SqliteEmployeeRepository::try_new(conn.clone())?;
    let total_employees = employees.count_employees()?;
    let directory = EmployeeDirectory::with_cache(employees, Arc::clone(&cache))
        .with_max_page_size(config.max_page_size);
    let users = UserService::new(SqliteUserRepository::try_new(conn)?, cache);

    if config.seed_defaults {
        match (&config.seed_admin_hash, &config.seed_employee_hash) {
            (Some(admin_hash), Some(employee_hash)) => {
                let created = users.ensure_default_users(admin_hash, employee_hash)?;
                println!("staffdir seeded_users={created}");
            }
            _ => warn!(
                "event=seed_users module=cli status=skipped reason=missing_hash vars={ENV_SEED_ADMIN_HASH},{ENV_SEED_EMPLOYEE_HASH}"
            ),
        }
    }

    // An admin view of the first page doubles as a read-path probe.
    let first_page = directory.list(
        &ListRequest::new(EmployeeFilter::default())
            .with_page(0, i64::from(config.default_page_size)),
        &Principal::admin("staffdir-cli"),
    )?;

    println!("staffdir_core ping={}", staffdir_core::ping());
    println!("staffdir_core version={}", staffdir_core::core_version());
    println!("staffdir db={}", config.db_path.display());
    println!(
        "staffdir employees={} pages={}",
        total_employees, first_page.page_info.total_pages
    );
    info!(
        "event=cli_run module=cli status=ok employees={total_employees} seeded={}",
        config.seed_defaults
    );
    Ok(())
}
