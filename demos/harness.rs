// Examples are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Vaultfix Harness Example
//!
//! Walks through one harness-managed test invocation: session workspace,
//! per-test fixture, and a funded+synced node handle. The node RPC is an
//! in-memory stand-in so the walkthrough runs without a real bitcoind on
//! the host.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example harness
//!
//! # Verbose lifecycle logging
//! RUST_LOG=debug cargo run --example harness
//!
//! # Session workspaces under a custom base directory
//! TEST_DIR=/tmp/vaultfix-demo cargo run --example harness
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use vaultfix::daemon::Result as DaemonResult;
use vaultfix::prelude::*;

/// In-memory node stand-in: each mined block pays a fixed reward to the
/// wallet and raises the chain height by one.
struct DemoNode {
    balance: AtomicU64,
    height: AtomicU64,
}

impl DemoNode {
    fn new() -> Self {
        Self {
            balance: AtomicU64::new(0),
            height: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl NodeRpc for DemoNode {
    async fn startup(&self) -> DaemonResult<()> {
        tracing::info!("demo node process up, RPC reachable");
        Ok(())
    }

    async fn create_wallet(&self, options: &WalletOptions) -> DaemonResult<()> {
        tracing::info!(wallet = %options.name, "wallet created");
        Ok(())
    }

    async fn balance(&self) -> DaemonResult<u64> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn new_address(&self) -> DaemonResult<String> {
        Ok("bcrt1qdemoaddress".to_string())
    }

    async fn generate_to_address(&self, blocks: u32, address: &str) -> DaemonResult<()> {
        tracing::info!(blocks, address, "mining");
        self.balance
            .fetch_add(u64::from(blocks) * 25, Ordering::SeqCst);
        self.height.fetch_add(u64::from(blocks), Ordering::SeqCst);
        Ok(())
    }

    async fn block_count(&self) -> DaemonResult<u64> {
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn cleanup(&self) -> DaemonResult<()> {
        tracing::info!("demo node terminated");
        Ok(())
    }

    fn rpc_endpoint(&self) -> String {
        "127.0.0.1:18443".to_string()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = HarnessConfig::from_env()?;
    let workspace = SessionWorkspace::create(&config)?;

    let fixture = TestFixture::set_up(&workspace, &config, "demo_deposit")?;
    tracing::info!(dir = %fixture.dir().path().display(), "fixture ready");

    let mut node = NodeHandle::new(
        fixture.dir().path().join("bitcoind"),
        DemoNode::new(),
        SyncParams::from_config(&config),
    );
    node.start().await?;
    tracing::info!(endpoint = %node.rpc_endpoint(), "node funded and synced");

    node.cleanup().await?;
    fixture.tear_down(true)?;
    workspace.close()?;

    tracing::info!("clean session, nothing left on disk");
    Ok(())
}
