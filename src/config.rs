//! Runtime configuration and storage provider selection.
//!
//! Configuration comes from three places, in increasing precedence: the
//! YAML settings file, environment variables and CLI flags (the latter two
//! are merged by clap in the binary). The storage backend is chosen once,
//! at startup, by [`select`].

use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable carrying the deployment environment flag.
pub const ENVIRONMENT_VAR: &str = "MCLAREN_ENVIRONMENT";

/// Settings file used when none is given explicitly.
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

/// Connection string names, as they appear in the settings file.
pub const SQLITE_CONNECTION: &str = "SQLiteConnection";
pub const CLOUD_SQL_CONNECTION: &str = "CloudSqlConnection";

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path:?}")]
    #[diagnostic(code(mclaren::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path:?}")]
    #[diagnostic(
        code(mclaren::config::parse),
        help("The file must be YAML with a top-level ConnectionStrings mapping")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Connection string '{name}' is not configured")]
    #[diagnostic(
        code(mclaren::config::missing_connection_string),
        help("Set it under ConnectionStrings in the settings file or pass it on the command line")
    )]
    MissingConnectionString { name: String },

    #[error("Connection string '{name}' must start with {expected}")]
    #[diagnostic(code(mclaren::config::invalid_connection_string))]
    InvalidConnectionString { name: String, expected: String },
}

// =============================================================================
// Environment
// =============================================================================

/// Deployment environment flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    Production,
    /// Any other name.
    Other(String),
    #[default]
    Unset,
}

impl Environment {
    /// Interpret the raw flag. Matching is case-insensitive.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("") => Environment::Unset,
            Some(s) if s.eq_ignore_ascii_case("production") => Environment::Production,
            Some(s) if s.eq_ignore_ascii_case("development") => Environment::Development,
            Some(s) => Environment::Other(s.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "Development"),
            Environment::Production => write!(f, "Production"),
            Environment::Other(name) => write!(f, "{}", name),
            Environment::Unset => write!(f, "unset"),
        }
    }
}

// =============================================================================
// Settings file
// =============================================================================

/// Named connection strings, one per backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ConnectionStrings {
    #[serde(rename = "SQLiteConnection", default)]
    pub sqlite: Option<String>,
    #[serde(rename = "CloudSqlConnection", default)]
    pub cloud: Option<String>,
}

/// Contents of the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(rename = "ConnectionStrings", default)]
    pub connection_strings: ConnectionStrings,
}

impl Settings {
    /// Read settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw, path)
    }

    /// Read settings if the file exists, otherwise start from empty settings.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply explicit overrides (CLI flags or environment variables).
    pub fn with_overrides(mut self, sqlite: Option<String>, cloud: Option<String>) -> Self {
        if sqlite.is_some() {
            self.connection_strings.sqlite = sqlite;
        }
        if cloud.is_some() {
            self.connection_strings.cloud = cloud;
        }
        self
    }
}

// =============================================================================
// Storage provider selection
// =============================================================================

/// Concrete database engine behind the data context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriver {
    /// Embedded file (or in-memory) database.
    Sqlite,
    /// Managed cloud SQL database.
    Postgres,
}

impl StorageDriver {
    fn schemes(&self) -> &'static [&'static str] {
        match self {
            StorageDriver::Sqlite => &["sqlite:"],
            StorageDriver::Postgres => &["postgres://", "postgresql://"],
        }
    }
}

impl fmt::Display for StorageDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDriver::Sqlite => write!(f, "sqlite"),
            StorageDriver::Postgres => write!(f, "postgres"),
        }
    }
}

/// How to reach the active backend. Resolved once per process.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    pub connection_string: String,
    pub max_connections: u32,
}

impl StorageConfig {
    /// In-memory SQLite, used by tests and throwaway runs.
    pub fn in_memory() -> Self {
        Self {
            driver: StorageDriver::Sqlite,
            connection_string: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    /// Whether the database lives only as long as its connection.
    pub fn is_in_memory(&self) -> bool {
        self.driver == StorageDriver::Sqlite
            && (self.connection_string.contains(":memory:")
                || self.connection_string.contains("mode=memory"))
    }

    /// Connection target with credentials and query parameters removed.
    pub fn redacted_target(&self) -> String {
        let without_query = self
            .connection_string
            .split('?')
            .next()
            .unwrap_or_default();
        match without_query.split_once("://") {
            Some((scheme, rest)) => {
                let host = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
                format!("{scheme}://{host}")
            }
            None => without_query.to_string(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("driver", &self.driver)
            .field("target", &self.redacted_target())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Default pool size for file and server databases.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Choose the storage configuration for this process.
///
/// `Production` selects the managed cloud database; every other environment
/// selects the embedded database.
pub fn select(
    environment: &Environment,
    connections: &ConnectionStrings,
) -> Result<StorageConfig, ConfigError> {
    let (driver, name, value) = if environment.is_production() {
        (
            StorageDriver::Postgres,
            CLOUD_SQL_CONNECTION,
            connections.cloud.as_deref(),
        )
    } else {
        (
            StorageDriver::Sqlite,
            SQLITE_CONNECTION,
            connections.sqlite.as_deref(),
        )
    };

    let connection_string = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingConnectionString {
            name: name.to_string(),
        })?;

    if !driver
        .schemes()
        .iter()
        .any(|scheme| connection_string.starts_with(scheme))
    {
        return Err(ConfigError::InvalidConnectionString {
            name: name.to_string(),
            expected: driver.schemes().join(" or "),
        });
    }

    let mut config = StorageConfig {
        driver,
        connection_string: connection_string.to_string(),
        max_connections: DEFAULT_MAX_CONNECTIONS,
    };
    if config.is_in_memory() {
        config.max_connections = 1;
    }
    Ok(config)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
