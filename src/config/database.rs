//! Database connection settings.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// How a session ends its unit of work when it is released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Commit when the session is closed normally, roll back when it is
    /// dropped early or the scoped closure returns an error.
    #[default]
    OnSuccess,
    /// Only work passed to an explicit `Session::commit` is kept.
    Manual,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URI. A plain path, `:memory:`, a SQLite `file:` URI, or
    /// a `sqlite:///path` style URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of pooled connections. In-memory databases always
    /// use a single connection.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long `acquire_session` waits for a free connection.
    #[serde(default = "default_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite `busy_timeout` applied to every connection.
    #[serde(default = "default_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub commit: CommitMode,

    /// Apply embedded migrations when connecting.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_url() -> String {
    "todo.db".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_run_migrations() -> bool {
    true
}

impl DatabaseConfig {
    /// Default settings for the given connection URI.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "url" }.into());
        }
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connection_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pool_size: default_pool_size(),
            connection_timeout_ms: default_timeout_ms(),
            busy_timeout_ms: default_timeout_ms(),
            commit: CommitMode::default(),
            run_migrations: default_run_migrations(),
        }
    }
}
