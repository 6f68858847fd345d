//! Runtime configuration loaded from the environment.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;

use tracing_subscriber::EnvFilter;

pub const DB_URL_VAR: &str = "EDU_DB_URL";
pub const LOG_VAR: &str = "EDU_LOG";

pub const DEFAULT_DB_URL: &str = "sqlite://edu.sqlite3?mode=rwc";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.to_owned(),
            log_filter: DEFAULT_LOG.to_owned(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `EDU_DB_URL` and `EDU_LOG`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but blank, or if
    /// the log filter cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = read_var(&lookup, DB_URL_VAR)?.unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        let log_filter = read_var(&lookup, LOG_VAR)?.unwrap_or_else(|| DEFAULT_LOG.to_owned());

        EnvFilter::try_new(&log_filter).map_err(|e| ConfigError::InvalidValue {
            var: LOG_VAR,
            reason: e.to_string(),
        })?;

        Ok(Self {
            database_url,
            log_filter,
        })
    }

    /// The parsed log filter.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the filter does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        EnvFilter::try_new(&self.log_filter).map_err(|e| ConfigError::InvalidValue {
            var: LOG_VAR,
            reason: e.to_string(),
        })
    }
}

fn read_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            var,
            reason: "must not be blank".to_owned(),
        }),
        Some(value) => Ok(Some(value.trim().to_owned())),
    }
}
