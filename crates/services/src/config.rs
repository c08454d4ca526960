//! Application configuration.
//!
//! Loaded with the `config` crate from an optional TOML file, overlaid with
//! `ACTIVATOR__`-prefixed environment variables (`ACTIVATOR__DATABASE__URL`,
//! `ACTIVATOR__LOGGING__LEVEL`, ...). Every field has a default, so an empty
//! source yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storage::sqlite::PoolSettings;

use crate::error::ConfigError;

/// Root application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Live feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum records per snapshot.
    pub recent_limit: u32,
    /// Undelivered snapshots held per subscriber before the producer waits.
    pub buffer: usize,
    /// Change notifications retained for slow subscribers.
    pub change_capacity: usize,
    /// How often a feed checks storage for writes made by other processes.
    pub poll_interval_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `"info"` or `"services=debug,info"`.
    pub level: String,
    /// `"pretty"` or `"json"`.
    pub format: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://activator.sqlite3".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 5,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            recent_limit: 50,
            buffer: 16,
            change_capacity: 64,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_seconds),
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if the
    /// merged values are out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("ACTIVATOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for values the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.feed.recent_limit == 0
            || self.feed.buffer == 0
            || self.feed.change_capacity == 0
            || self.feed.poll_interval_ms == 0
        {
            return Err(ConfigError::Invalid(
                "feed limits must be positive".into(),
            ));
        }
        Ok(())
    }
}
