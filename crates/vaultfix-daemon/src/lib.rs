// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vaultfix-daemon
//!
//! Daemon process handles and network composition for the vaultfix harness.
//!
//! The harness drives real processes over RPC, never mocks; what lives here
//! is the lifecycle layer around those processes:
//!
//! - [`NodeHandle`] — one blockchain node, funded and height-synced before
//!   it is yielded to a test
//! - [`StakeholderHandle`] / [`ManagerHandle`] — the two vault daemon role
//!   variants, sharing a constructor contract
//! - [`VaultNetwork`] — a multi-party composition over one node and an
//!   external relational store, with fail-fast credential checks and
//!   sibling teardown on partial start
//!
//! Process spawning itself lives behind the [`NodeRpc`], [`VaultdProcess`]
//! and [`VaultdSpawner`] collaborator contracts, so tests can substitute
//! spies and the harness stays independent of any one wrapper.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod network;
pub mod node;
pub mod roster;
pub mod vaultd;

pub use error::{DaemonError, Result};
pub use keys::{COORDINATOR_NOISE_KEY, CoordinatorKey, Keychain, NoiseKey, SecretSeed};
pub use network::{NetworkTopology, ProcessSpawner, VaultNetwork, VaultdSpawner};
pub use node::{NodeHandle, NodeRpc, SyncParams, WalletOptions};
pub use roster::ParticipantRoster;
pub use vaultd::{
    Endpoint, ManagerConfig, ManagerHandle, Role, StakeholderConfig, StakeholderHandle,
    VaultDaemon, VaultdParams, VaultdProcess,
};
