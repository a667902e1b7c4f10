//! Blockchain node handle.
//!
//! Wraps one node process behind the [`NodeRpc`] collaborator contract and
//! drives it through `created → started → funded+synced → cleaned up`. A
//! test must not receive the handle before both post-start invariants hold:
//! wallet balance at or above the funding threshold, and chain height past
//! the minimum. The original behavior polled for these with infinite
//! patience; here each loop carries a poll cap and surfaces
//! [`DaemonError::SyncTimeout`] instead of hanging on a wedged node.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DaemonError, Result};

/// RPC-facing contract the node process wrapper must expose.
///
/// Startup readiness (waiting for the RPC interface to come up) is the
/// wrapper's responsibility; `startup()` returns once calls can be made.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Spawns the process rooted at its working directory and blocks until
    /// the RPC interface is reachable.
    async fn startup(&self) -> Result<()>;

    /// Creates a wallet.
    async fn create_wallet(&self, options: &WalletOptions) -> Result<()>;

    /// Returns the default wallet's confirmed balance, in whole coins.
    async fn balance(&self) -> Result<u64>;

    /// Derives a fresh receive address.
    async fn new_address(&self) -> Result<String>;

    /// Mines `blocks` blocks paying to `address`.
    async fn generate_to_address(&self, blocks: u32, address: &str) -> Result<()>;

    /// Returns the current chain height.
    async fn block_count(&self) -> Result<u64>;

    /// Terminates the process and releases its resources.
    async fn cleanup(&self) -> Result<()>;

    /// Returns the RPC endpoint vault daemons should be pointed at.
    fn rpc_endpoint(&self) -> String;
}

/// Wallet creation options.
#[derive(Debug, Clone)]
pub struct WalletOptions {
    /// Wallet name.
    pub name: String,
    /// Wallet passphrase; empty means unencrypted.
    pub passphrase: String,
    /// Whether the wallet is watch-only (no private keys).
    pub watch_only: bool,
    /// Whether to rescan the chain on creation.
    pub rescan: bool,
    /// Whether to mark the wallet as the node's default.
    pub default_wallet: bool,
}

impl WalletOptions {
    /// The wallet every test node gets: unencrypted, holding its own keys,
    /// no rescan (for speed), marked default.
    #[must_use]
    pub fn default_test_wallet() -> Self {
        Self {
            name: "vaultfix".to_string(),
            passphrase: String::new(),
            watch_only: false,
            rescan: false,
            default_wallet: true,
        }
    }
}

/// Thresholds and pacing for the post-start synchronization loops.
#[derive(Debug, Clone)]
pub struct SyncParams {
    /// Minimum wallet balance, in whole coins.
    pub min_balance: u64,
    /// The chain height must strictly exceed this.
    pub min_height: u64,
    /// Sleep between height polls.
    pub poll_interval: Duration,
    /// Maximum polls per loop before giving up.
    pub poll_cap: u32,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            min_balance: 50,
            min_height: 1,
            poll_interval: Duration::from_millis(100),
            poll_cap: 600,
        }
    }
}

impl SyncParams {
    /// Derives sync parameters from the harness configuration.
    #[must_use]
    pub fn from_config(config: &vaultfix_core::HarnessConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            poll_cap: config.sync_poll_cap,
            ..Self::default()
        }
    }
}

/// Lifecycle state of a node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Created,
    Started,
    Synced,
    CleanedUp,
}

/// Handle to one blockchain node process.
pub struct NodeHandle<C: NodeRpc> {
    dir: PathBuf,
    client: C,
    params: SyncParams,
    state: NodeState,
}

impl<C: NodeRpc> NodeHandle<C> {
    /// Creates a handle rooted at `dir`, not yet started.
    pub fn new(dir: impl Into<PathBuf>, client: C, params: SyncParams) -> Self {
        Self {
            dir: dir.into(),
            client,
            params,
            state: NodeState::Created,
        }
    }

    /// Returns the node's working directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the RPC endpoint for daemons that depend on this node.
    #[must_use]
    pub fn rpc_endpoint(&self) -> String {
        self.client.rpc_endpoint()
    }

    /// Returns true once both post-start invariants hold.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.state == NodeState::Synced
    }

    /// Starts the node and establishes the funded+synced invariants.
    ///
    /// Spawns the process, creates the default test wallet, mines to fresh
    /// addresses until the balance reaches the funding threshold, then polls
    /// until the chain height passes the minimum.
    ///
    /// # Errors
    /// Returns an error if any RPC call fails or a sync loop hits its poll
    /// cap. On error the handle stays safe to `cleanup()`.
    pub async fn start(&mut self) -> Result<()> {
        self.client.startup().await?;
        self.state = NodeState::Started;

        self.client
            .create_wallet(&WalletOptions::default_test_wallet())
            .await?;

        self.fund_wallet().await?;
        self.wait_for_height().await?;

        self.state = NodeState::Synced;
        tracing::info!(dir = %self.dir.display(), "node funded and synced");
        Ok(())
    }

    /// Mines one block to a fresh address until the balance threshold holds.
    async fn fund_wallet(&self) -> Result<()> {
        for attempt in 0..self.params.poll_cap {
            let balance = self.client.balance().await?;
            if balance >= self.params.min_balance {
                tracing::debug!(balance, blocks_mined = attempt, "wallet funded");
                return Ok(());
            }
            let address = self.client.new_address().await?;
            self.client.generate_to_address(1, &address).await?;
        }
        Err(DaemonError::sync_timeout(
            format!("wallet balance >= {}", self.params.min_balance),
            self.params.poll_cap,
        ))
    }

    /// Polls the chain height until it exceeds the minimum.
    async fn wait_for_height(&self) -> Result<()> {
        for _ in 0..self.params.poll_cap {
            let height = self.client.block_count().await?;
            if height > self.params.min_height {
                tracing::debug!(height, "chain height reached");
                return Ok(());
            }
            tokio::time::sleep(self.params.poll_interval).await;
        }
        Err(DaemonError::sync_timeout(
            format!("block height > {}", self.params.min_height),
            self.params.poll_cap,
        ))
    }

    /// Terminates the process and releases its resources.
    ///
    /// Idempotent, and safe to call after a failed or partial `start()`.
    ///
    /// # Errors
    /// Returns an error if termination fails.
    pub async fn cleanup(&mut self) -> Result<()> {
        if self.state == NodeState::CleanedUp {
            return Ok(());
        }
        self.client.cleanup().await?;
        self.state = NodeState::CleanedUp;
        tracing::debug!(dir = %self.dir.display(), "node cleaned up");
        Ok(())
    }
}
