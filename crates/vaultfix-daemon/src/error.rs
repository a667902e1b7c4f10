//! Error types for vaultfix-daemon.

/// Result type alias for daemon handle operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors raised by daemon handles and the network factory.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration error, raised before any process is spawned.
    #[error("configuration error: {0}")]
    Config(String),

    /// A daemon process failed to start or become reachable.
    #[error("startup failed: {0}")]
    Startup(String),

    /// An RPC call to a running daemon failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A daemon failed to terminate cleanly.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// A post-start synchronization loop exhausted its retry budget.
    #[error("timed out waiting for {target} after {attempts} polls")]
    SyncTimeout {
        /// What was being waited for.
        target: String,
        /// Number of polls performed before giving up.
        attempts: u32,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the isolation layer.
    #[error("harness error: {0}")]
    Harness(#[from] vaultfix_core::HarnessError),
}

impl DaemonError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a startup error.
    #[must_use]
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    /// Creates an RPC error.
    #[must_use]
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Creates a sync timeout error.
    #[must_use]
    pub fn sync_timeout(target: impl Into<String>, attempts: u32) -> Self {
        Self::SyncTimeout {
            target: target.into(),
            attempts,
        }
    }
}
