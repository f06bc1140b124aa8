//! Process configuration for todo core callers.
//!
//! # Responsibility
//! - Resolve database location and logging settings from the environment.
//! - Validate settings up front so bootstrap fails before touching storage.
//!
//! Recognized variables: `TODO_DB_PATH`, `TODO_LOG_LEVEL`, `TODO_LOG_DIR`.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{
    default_log_level, init_logging, normalize_level, normalize_log_dir, LoggingError,
};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "TODO_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "TODO_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TODO_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    EmptyDbPath,
    InvalidLogLevel(LoggingError),
    InvalidLogDir(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "{DB_PATH_VAR} cannot be empty"),
            Self::InvalidLogLevel(err) => write!(f, "{LOG_LEVEL_VAR}: {err}"),
            Self::InvalidLogDir(err) => write!(f, "{LOG_DIR_VAR}: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EmptyDbPath => None,
            Self::InvalidLogLevel(err) | Self::InvalidLogDir(err) => Some(err),
        }
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file; `None` selects an in-memory store.
    pub db_path: Option<PathBuf>,
    /// Normalized log level.
    pub log_level: &'static str,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = match lookup(DB_PATH_VAR) {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyDbPath),
            Some(value) => Some(PathBuf::from(value.trim())),
            None => None,
        };

        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let log_dir = lookup(LOG_DIR_VAR)
            .map(|value| normalize_log_dir(PathBuf::from(value.trim()).as_path()))
            .transpose()
            .map_err(ConfigError::InvalidLogDir)?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }

    /// Opens the configured store with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        match self.db_path.as_ref() {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        match self.log_dir.as_ref() {
            Some(dir) => init_logging(self.log_level, dir),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DB_PATH_VAR, LOG_DIR_VAR, LOG_LEVEL_VAR};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn reads_and_normalizes_all_variables() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (DB_PATH_VAR, " /var/lib/todo/todo.sqlite3 "),
            (LOG_LEVEL_VAR, "WARNING"),
            (LOG_DIR_VAR, "/var/log/todo"),
        ]))
        .unwrap();

        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/todo/todo.sqlite3"))
        );
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/todo")));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            CoreConfig::from_lookup(lookup_from(&[(DB_PATH_VAR, "  ")])),
            Err(ConfigError::EmptyDbPath)
        ));
        assert!(matches!(
            CoreConfig::from_lookup(lookup_from(&[(LOG_LEVEL_VAR, "loud")])),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            CoreConfig::from_lookup(lookup_from(&[(LOG_DIR_VAR, "relative/logs")])),
            Err(ConfigError::InvalidLogDir(_))
        ));
    }

    #[test]
    fn unset_db_path_opens_in_memory_store() {
        let conn = CoreConfig::default().open_db().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM todos;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
