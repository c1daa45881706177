//! Environment-driven runtime configuration.
//!
//! # Invariants
//! - Missing variables fall back to defaults; malformed ones are errors that
//!   name the variable.
//! - `default_page_size <= max_page_size`.

use crate::logging::{default_log_level, LoggingConfig};
use crate::service::directory::DEFAULT_MAX_PAGE_SIZE;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "STAFFDIR_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "STAFFDIR_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STAFFDIR_LOG_DIR";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "STAFFDIR_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "STAFFDIR_MAX_PAGE_SIZE";
pub const ENV_SEED_DEFAULTS: &str = "STAFFDIR_SEED_DEFAULTS";
pub const ENV_SEED_ADMIN_HASH: &str = "STAFFDIR_SEED_ADMIN_HASH";
pub const ENV_SEED_EMPLOYEE_HASH: &str = "STAFFDIR_SEED_EMPLOYEE_HASH";

const DEFAULT_DB_FILE: &str = "staffdir.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "staffdir-logs";
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
    PageSizeExceedsMax {
        default_page_size: u32,
        max_page_size: u32,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                expected,
            } => write!(f, "{variable}=`{value}` is invalid; expected {expected}"),
            Self::PageSizeExceedsMax {
                default_page_size,
                max_page_size,
            } => write!(
                f,
                "default page size {default_page_size} exceeds max page size {max_page_size}"
            ),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffdirConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Must be absolute.
    pub log_dir: PathBuf,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub seed_defaults: bool,
    /// Pre-computed hash for the seeded `admin` account.
    pub seed_admin_hash: Option<String>,
    /// Pre-computed hash for the seeded `employee` account.
    pub seed_employee_hash: Option<String>,
}

impl Default for StaffdirConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            seed_defaults: false,
            seed_admin_hash: None,
            seed_employee_hash: None,
        }
    }
}

impl StaffdirConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value
    /// when set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_DEFAULT_PAGE_SIZE) {
            config.default_page_size = parse_page_size(ENV_DEFAULT_PAGE_SIZE, &value)?;
        }
        if let Some(value) = read(ENV_MAX_PAGE_SIZE) {
            config.max_page_size = parse_page_size(ENV_MAX_PAGE_SIZE, &value)?;
        }
        if let Some(value) = read(ENV_SEED_DEFAULTS) {
            config.seed_defaults = parse_flag(ENV_SEED_DEFAULTS, &value)?;
        }
        config.seed_admin_hash = read(ENV_SEED_ADMIN_HASH);
        config.seed_employee_hash = read(ENV_SEED_EMPLOYEE_HASH);

        if config.default_page_size > config.max_page_size {
            return Err(ConfigError::PageSizeExceedsMax {
                default_page_size: config.default_page_size,
                max_page_size: config.max_page_size,
            });
        }
        Ok(config)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::new(self.log_level.clone(), self.log_dir.clone())
    }
}

fn parse_page_size(variable: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            variable,
            value: value.to_string(),
            expected: "a positive integer",
        })
}

fn parse_flag(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            variable,
            value: value.to_string(),
            expected: "true|false",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StaffdirConfig, ENV_MAX_PAGE_SIZE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(vars: &[(&str, &str)]) -> Result<StaffdirConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        StaffdirConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, StaffdirConfig::default());
        assert!(config.log_dir.is_absolute());
        assert!(!config.seed_defaults);
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("STAFFDIR_DB_PATH", "/var/lib/staffdir/db.sqlite3"),
            ("STAFFDIR_LOG_LEVEL", "warn"),
            ("STAFFDIR_LOG_DIR", "/var/log/staffdir"),
            ("STAFFDIR_DEFAULT_PAGE_SIZE", "20"),
            ("STAFFDIR_MAX_PAGE_SIZE", "200"),
            ("STAFFDIR_SEED_DEFAULTS", "yes"),
            ("STAFFDIR_SEED_ADMIN_HASH", "hash-a"),
            ("STAFFDIR_SEED_EMPLOYEE_HASH", " "),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/staffdir/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 200);
        assert!(config.seed_defaults);
        assert_eq!(config.seed_admin_hash.as_deref(), Some("hash-a"));
        assert_eq!(config.seed_employee_hash, None);
        assert_eq!(config.logging().log_dir, PathBuf::from("/var/log/staffdir"));
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = load(&[("STAFFDIR_MAX_PAGE_SIZE", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { variable, .. } if variable == ENV_MAX_PAGE_SIZE
        ));
        assert!(load(&[("STAFFDIR_MAX_PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("STAFFDIR_SEED_DEFAULTS", "maybe")]).is_err());
    }

    #[test]
    fn default_page_size_must_fit_max() {
        let err = load(&[("STAFFDIR_MAX_PAGE_SIZE", "5")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PageSizeExceedsMax {
                default_page_size: 10,
                max_page_size: 5
            }
        );
    }
}
