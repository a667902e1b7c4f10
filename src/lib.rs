//! Vaultfix: Test-Orchestration Harness for Vault Daemon Networks
//!
//! Drives integration tests against real external processes: a blockchain
//! node, per-role vault daemons and multi-party compositions of both, with
//! per-test directory isolation, outcome-dependent retention and bounded
//! synchronization.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vaultfix::prelude::*;
//!
//! // Re-exports from sub-crates for convenience
//! ```

pub use vaultfix_core as core;
pub use vaultfix_daemon as daemon;

/// Prelude module for common imports.
pub mod prelude {
    pub use vaultfix_core::{
        BacktraceGuard, HarnessConfig, HarnessError, PostgresCreds, SessionWorkspace, TaskPool,
        TestDir, TestFixture,
    };
    pub use vaultfix_daemon::{
        DaemonError, ManagerHandle, NetworkTopology, NodeHandle, NodeRpc, Role, StakeholderHandle,
        SyncParams, VaultDaemon, VaultNetwork, VaultdSpawner, WalletOptions,
    };
}
