//! Runtime configuration for the taskboard core.
//!
//! Values come from `TASKBOARD_*` environment variables. Empty values count
//! as unset. Every key has a default, so an empty environment is valid and
//! yields an in-memory store without file logging.

use crate::db::DatabaseLocation;
use crate::service::UnknownIdPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const DB_PATH_VAR: &str = "TASKBOARD_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "TASKBOARD_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TASKBOARD_LOG_DIR";
pub const UNKNOWN_IDS_VAR: &str = "TASKBOARD_UNKNOWN_IDS";

const MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid {key} `{value}`; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `debug` for debug builds, `info` for release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub database: DatabaseLocation,
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub unknown_ids: UnknownIdPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::Memory,
            log_level: LogLevel::for_build(),
            log_dir: None,
            unknown_ids: UnknownIdPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Reads the process environment. Variables that are not valid UTF-8 are
    /// ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Builds a config from key/value pairs. Unrelated keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                DB_PATH_VAR => config.database = parse_database(value),
                LOG_LEVEL_VAR => {
                    config.log_level = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: LOG_LEVEL_VAR,
                        value: value.to_string(),
                        expected: "trace|debug|info|warn|error",
                    })?
                }
                LOG_DIR_VAR => config.log_dir = Some(parse_log_dir(value)?),
                UNKNOWN_IDS_VAR => {
                    config.unknown_ids = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: UNKNOWN_IDS_VAR,
                        value: value.to_string(),
                        expected: "reject|skip",
                    })?
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn parse_database(value: &str) -> DatabaseLocation {
    if value == MEMORY_DB_PATH {
        DatabaseLocation::Memory
    } else {
        DatabaseLocation::File(PathBuf::from(value))
    }
}

fn parse_log_dir(value: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(value);
    if !path.is_absolute() {
        return Err(ConfigError::InvalidValue {
            key: LOG_DIR_VAR,
            value: value.to_string(),
            expected: "an absolute directory path",
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, LogLevel, LOG_DIR_VAR, UNKNOWN_IDS_VAR};
    use crate::db::DatabaseLocation;
    use crate::service::UnknownIdPolicy;
    use std::path::PathBuf;

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.database, DatabaseLocation::Memory);
        assert_eq!(config.unknown_ids, UnknownIdPolicy::Reject);
    }

    #[test]
    fn recognized_keys_are_applied() {
        let config = CoreConfig::from_vars([
            ("TASKBOARD_DB_PATH", "/var/lib/taskboard/board.sqlite3"),
            ("TASKBOARD_LOG_LEVEL", "WARNING"),
            ("TASKBOARD_LOG_DIR", "/var/log/taskboard"),
            ("TASKBOARD_UNKNOWN_IDS", "skip"),
            ("HOME", "/root"),
        ])
        .unwrap();

        assert_eq!(
            config.database,
            DatabaseLocation::File(PathBuf::from("/var/lib/taskboard/board.sqlite3"))
        );
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/taskboard")));
        assert_eq!(config.unknown_ids, UnknownIdPolicy::Skip);
    }

    #[test]
    fn memory_marker_and_blank_values() {
        let config =
            CoreConfig::from_vars([("TASKBOARD_DB_PATH", ":memory:"), ("TASKBOARD_LOG_DIR", "  ")])
                .unwrap();
        assert_eq!(config.database, DatabaseLocation::Memory);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let relative = CoreConfig::from_vars([(LOG_DIR_VAR, "logs")]).unwrap_err();
        assert!(matches!(
            relative,
            ConfigError::InvalidValue {
                key: LOG_DIR_VAR,
                ..
            }
        ));

        let policy = CoreConfig::from_vars([(UNKNOWN_IDS_VAR, "ignore")]).unwrap_err();
        assert_eq!(
            policy.to_string(),
            "invalid TASKBOARD_UNKNOWN_IDS `ignore`; expected reject|skip"
        );
    }
}
