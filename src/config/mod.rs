//! Configuration Management
//!
//! Connection settings are read once at process start from five environment
//! variables. A `.env` file in the working directory (or a parent) fills in
//! variables the process environment leaves unset. There is no runtime
//! reconfiguration.
//!
//! | Variable | Default |
//! |---|---|
//! | `MYSQL_HOST` | `localhost` |
//! | `MYSQL_PORT` | `3306` |
//! | `MYSQL_DATABASE` | `sakila` |
//! | `MYSQL_USER` | `sakila_user` |
//! | `MYSQL_PASSWORD` | `sakila_pass` |

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{GateError, Result};

/// Environment variable names
pub const ENV_HOST: &str = "MYSQL_HOST";
pub const ENV_PORT: &str = "MYSQL_PORT";
pub const ENV_DATABASE: &str = "MYSQL_DATABASE";
pub const ENV_USER: &str = "MYSQL_USER";
pub const ENV_PASSWORD: &str = "MYSQL_PASSWORD";

/// Connection parameters for the MySQL server
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Database (schema) name
    pub database: String,
    /// Username
    pub user: String,
    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "sakila".to_string(),
            user: "sakila_user".to_string(),
            password: "sakila_pass".to_string(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DatabaseSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load `.env` into the process environment, then read settings from it.
    ///
    /// Variables already set in the environment win over the file. A missing
    /// file is normal; an unreadable one is logged and skipped.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env"),
        }
        Self::from_env()
    }

    /// Read settings from `lookup`, falling back to the entries of an env file
    pub fn from_env_file<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| GateError::config_error(format!("cannot read {}: {e}", path.display())))?;
        let file = entries
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(|e| GateError::config_error(format!("malformed {}: {e}", path.display())))?;

        Self::from_lookup(|key| lookup(key).or_else(|| file.get(key).cloned()))
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// Missing or blank values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get(ENV_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => defaults.port,
        };

        Ok(Self {
            host: get(ENV_HOST).unwrap_or(defaults.host),
            port,
            database: get(ENV_DATABASE).unwrap_or(defaults.database),
            user: get(ENV_USER).unwrap_or(defaults.user),
            password: lookup(ENV_PASSWORD).unwrap_or(defaults.password),
        })
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(GateError::config_error(format!(
            "{ENV_PORT} must be a port number between 1 and 65535, got '{raw}'"
        ))),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = DatabaseSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, DatabaseSettings::default());
        assert_eq!(settings.port, 3306);
        assert_eq!(settings.database, "sakila");
    }

    #[test]
    fn test_reads_all_five_settings() {
        let settings = DatabaseSettings::from_lookup(lookup_from(&[
            (ENV_HOST, "db.internal"),
            (ENV_PORT, "3307"),
            (ENV_DATABASE, "sakila_test"),
            (ENV_USER, "test_user"),
            (ENV_PASSWORD, "test_pass"),
        ]))
        .unwrap();

        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.port, 3307);
        assert_eq!(settings.database, "sakila_test");
        assert_eq!(settings.user, "test_user");
        assert_eq!(settings.password, "test_pass");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        for bad in ["abc", "0", "70000", "-1"] {
            let err = DatabaseSettings::from_lookup(lookup_from(&[(ENV_PORT, bad)])).unwrap_err();
            assert!(matches!(err, GateError::ConfigError(_)), "port {bad}");
        }
    }

    #[test]
    fn test_env_file_fills_unset_variables() {
        let path = std::env::temp_dir().join(format!("sakila-mcp-{}.env", std::process::id()));
        std::fs::write(&path, "MYSQL_HOST=file-host\nMYSQL_PORT=3310\n# comment\nMYSQL_USER=file_user\n").unwrap();

        let settings =
            DatabaseSettings::from_env_file(&path, lookup_from(&[(ENV_USER, "process_user")])).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.host, "file-host");
        assert_eq!(settings.port, 3310);
        assert_eq!(settings.user, "process_user");
        assert_eq!(settings.database, "sakila");
    }

    #[test]
    fn test_missing_env_file_is_config_error() {
        let path = std::env::temp_dir().join("sakila-mcp-does-not-exist.env");
        let err = DatabaseSettings::from_env_file(&path, |_| None).unwrap_err();
        assert!(matches!(err, GateError::ConfigError(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = DatabaseSettings::default();
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("sakila_pass"));
    }
}
