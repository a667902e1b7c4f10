//! Error types for vaultfix-core.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors raised by the isolation and lifecycle layer.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration error (missing or invalid environment/config values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A test directory survived a recursive delete after a clean session.
    ///
    /// Silent leakage would corrupt isolation guarantees for later attempts
    /// reusing the same workspace, so this is fatal to the fixture.
    #[error("directory {path} could not be removed, still contains {files:?}")]
    Cleanup {
        /// The directory that could not be removed.
        path: PathBuf,
        /// Files still present after the delete attempt.
        files: Vec<PathBuf>,
    },

    /// A polling loop exhausted its retry budget.
    #[error("timed out waiting for {target} after {waited:?}")]
    SyncTimeout {
        /// What was being waited for.
        target: String,
        /// Total time spent polling.
        waited: Duration,
    },

    /// A task was submitted to a pool that has been shut down.
    #[error("task pool is closed")]
    PoolClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a sync timeout error.
    #[must_use]
    pub fn sync_timeout(target: impl Into<String>, waited: Duration) -> Self {
        Self::SyncTimeout {
            target: target.into(),
            waited,
        }
    }

    /// Returns true if this error aborts the whole fixture rather than
    /// a single operation.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Cleanup { .. })
    }
}
