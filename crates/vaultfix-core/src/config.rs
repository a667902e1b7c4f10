//! Harness configuration.
//!
//! Configuration is read from the environment the way the enclosing test
//! runner provides it, with an optional TOML file for overrides. Validation
//! happens at load time so a misconfigured run fails before any daemon is
//! spawned.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Environment variable naming the base directory for session workspaces.
pub const TEST_DIR_VAR: &str = "TEST_DIR";

/// Environment variable overriding the per-test pool worker count.
pub const EXECUTOR_WORKERS_VAR: &str = "EXECUTOR_WORKERS";

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base directory under which the session workspace is created.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Worker count for each per-test task pool.
    #[serde(default = "default_pool_workers")]
    pub pool_workers: usize,

    /// Sleep interval between polls of external daemon state.
    #[serde(default = "default_poll_interval")]
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Maximum number of polls before a sync loop gives up.
    #[serde(default = "default_sync_poll_cap")]
    pub sync_poll_cap: u32,

    /// Relational store credentials, required only for multi-party networks.
    #[serde(default)]
    pub postgres: Option<PostgresCreds>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_pool_workers() -> usize {
    20
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_sync_poll_cap() -> u32 {
    600
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            pool_workers: default_pool_workers(),
            poll_interval: default_poll_interval(),
            sync_poll_cap: default_sync_poll_cap(),
            postgres: None,
        }
    }
}

impl HarnessConfig {
    /// Builds a configuration from the process environment.
    ///
    /// `TEST_DIR` overrides the base directory, `EXECUTOR_WORKERS` the pool
    /// size; Postgres credentials are picked up when all three are present.
    ///
    /// # Errors
    /// Returns an error if an override is present but unparseable.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(TEST_DIR_VAR) {
            config.base_dir = PathBuf::from(dir);
        }
        if let Ok(workers) = std::env::var(EXECUTOR_WORKERS_VAR) {
            config.pool_workers = workers.parse().map_err(|e| {
                HarnessError::config(format!("invalid {EXECUTOR_WORKERS_VAR} '{workers}': {e}"))
            })?;
        }
        config.postgres = PostgresCreds::from_env();

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, then validates it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| HarnessError::config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HarnessError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if any field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(HarnessError::config("base_dir cannot be empty"));
        }
        if self.pool_workers == 0 {
            return Err(HarnessError::config("pool_workers must be greater than 0"));
        }
        if self.sync_poll_cap == 0 {
            return Err(HarnessError::config("sync_poll_cap must be greater than 0"));
        }
        if let Some(creds) = &self.postgres {
            creds.validate()?;
        }
        Ok(())
    }
}

/// Credentials for the relational store backing a multi-party network.
///
/// All three fields are a hard precondition for building a network; their
/// absence is a configuration error, never a silent default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresCreds {
    /// Database user.
    pub user: String,
    /// Database password.
    pub pass: String,
    /// Database host.
    pub host: String,
}

impl PostgresCreds {
    /// Reads the credential triple from the environment.
    ///
    /// Returns `Some` only when `POSTGRES_USER`, `POSTGRES_PASS` and
    /// `POSTGRES_HOST` are all set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let user = std::env::var("POSTGRES_USER").ok()?;
        let pass = std::env::var("POSTGRES_PASS").ok()?;
        let host = std::env::var("POSTGRES_HOST").ok()?;
        Some(Self { user, pass, host })
    }

    /// Validates that no field is empty.
    ///
    /// # Errors
    /// Returns an error naming the empty field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("POSTGRES_USER", &self.user),
            ("POSTGRES_PASS", &self.pass),
            ("POSTGRES_HOST", &self.host),
        ] {
            if value.is_empty() {
                return Err(HarnessError::config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
