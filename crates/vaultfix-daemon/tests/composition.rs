//! Network composition and partial-failure teardown.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use vaultfix_core::PostgresCreds;
use vaultfix_daemon::{
    DaemonError, ManagerConfig, NetworkTopology, NodeHandle, NodeRpc, Result, Role,
    StakeholderConfig, SyncParams, VaultDaemon, VaultNetwork, VaultdParams, VaultdSpawner,
    WalletOptions,
};

// =============================================================================
// Spies
// =============================================================================

/// Counts spawner and lifecycle calls; optionally fails the Nth start.
#[derive(Default)]
struct SpyCounters {
    spawned: AtomicU32,
    starts: AtomicU32,
    cleanups: AtomicU32,
}

struct SpyDaemon {
    role: Role,
    port: u16,
    index: u32,
    fail_start_at: Option<u32>,
    counters: Arc<SpyCounters>,
}

#[async_trait]
impl VaultDaemon for SpyDaemon {
    fn role(&self) -> Role {
        self.role
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn start(&mut self) -> Result<()> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start_at == Some(self.index) {
            return Err(DaemonError::startup("spy refused to start"));
        }
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct SpySpawner {
    counters: Arc<SpyCounters>,
    fail_start_at: Option<u32>,
}

impl SpySpawner {
    fn new() -> (Self, Arc<SpyCounters>) {
        let counters = Arc::new(SpyCounters::default());
        (
            Self {
                counters: Arc::clone(&counters),
                fail_start_at: None,
            },
            counters,
        )
    }

    fn failing_at(index: u32) -> (Self, Arc<SpyCounters>) {
        let (mut spawner, counters) = Self::new();
        spawner.fail_start_at = Some(index);
        (spawner, counters)
    }

    fn spawn(&self, role: Role, port: u16) -> Box<dyn VaultDaemon> {
        let index = self.counters.spawned.fetch_add(1, Ordering::SeqCst);
        Box::new(SpyDaemon {
            role,
            port,
            index,
            fail_start_at: self.fail_start_at,
            counters: Arc::clone(&self.counters),
        })
    }
}

impl VaultdSpawner for SpySpawner {
    fn spawn_stakeholder(
        &self,
        params: VaultdParams,
        _config: StakeholderConfig,
    ) -> Result<Box<dyn VaultDaemon>> {
        Ok(self.spawn(Role::Stakeholder, params.port))
    }

    fn spawn_manager(
        &self,
        params: VaultdParams,
        _config: ManagerConfig,
    ) -> Result<Box<dyn VaultDaemon>> {
        Ok(self.spawn(Role::Manager, params.port))
    }
}

fn creds() -> PostgresCreds {
    PostgresCreds {
        user: "revault".to_string(),
        pass: "revault".to_string(),
        host: "localhost".to_string(),
    }
}

fn ports() -> impl Iterator<Item = u16> {
    19_000..
}

// =============================================================================
// Credential precondition
// =============================================================================

#[test]
fn test_missing_credentials_spawn_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (spawner, counters) = SpySpawner::new();

    let err = VaultNetwork::build(
        dir.path(),
        "127.0.0.1:18443",
        None,
        &NetworkTopology::default(),
        &spawner,
        &mut ports(),
    )
    .unwrap_err();

    assert!(matches!(err, DaemonError::Config(_)));
    assert!(err.to_string().contains("POSTGRES_USER"));
    assert_eq!(counters.spawned.load(Ordering::SeqCst), 0);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_credential_field_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (spawner, counters) = SpySpawner::new();
    let bad = PostgresCreds {
        host: String::new(),
        ..creds()
    };

    let err = VaultNetwork::build(
        dir.path(),
        "127.0.0.1:18443",
        Some(&bad),
        &NetworkTopology::default(),
        &spawner,
        &mut ports(),
    )
    .unwrap_err();

    assert!(matches!(err, DaemonError::Config(_)));
    assert_eq!(counters.spawned.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Composition and lifecycle
// =============================================================================

#[tokio::test]
async fn test_reference_topology_composes_and_starts() {
    let dir = tempfile::tempdir().unwrap();
    let (spawner, counters) = SpySpawner::new();

    let mut network = VaultNetwork::build(
        dir.path(),
        "127.0.0.1:18443",
        Some(&creds()),
        &NetworkTopology::default(),
        &spawner,
        &mut ports(),
    )
    .unwrap();

    // 2 stakeholders + 3 managers, distinct reserved ports, shared datadir.
    assert_eq!(network.daemons().len(), 5);
    assert!(network.datadir().ends_with("revaultd"));
    let mut seen_ports: Vec<u16> = network.daemons().iter().map(|d| d.port()).collect();
    seen_ports.sort_unstable();
    seen_ports.dedup();
    assert_eq!(seen_ports.len(), 5);

    network.start_all().await.unwrap();
    assert_eq!(network.started(), 5);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 5);

    network.cleanup().await.unwrap();
    assert_eq!(network.started(), 0);
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_third_daemon_failing_tears_down_first_two() {
    let dir = tempfile::tempdir().unwrap();
    let (spawner, counters) = SpySpawner::failing_at(2);

    let mut network = VaultNetwork::build(
        dir.path(),
        "127.0.0.1:18443",
        Some(&creds()),
        &NetworkTopology {
            n_stakeholders: 2,
            n_managers: 2,
            csv: 35,
        },
        &spawner,
        &mut ports(),
    )
    .unwrap();
    assert_eq!(network.daemons().len(), 4);

    let err = network.start_all().await.unwrap_err();
    assert!(matches!(err, DaemonError::Startup(_)));
    assert_eq!(network.started(), 0);

    // Starts were attempted up to and including the failing third daemon;
    // the two started siblings were cleaned up before the error propagated.
    assert_eq!(counters.starts.load(Ordering::SeqCst), 3);
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Node-before-network ordering
// =============================================================================

/// Minimal in-memory node for the ordering scenario.
struct FundingNode {
    balance: AtomicU64,
    height: AtomicU64,
}

#[async_trait]
impl NodeRpc for FundingNode {
    async fn startup(&self) -> Result<()> {
        Ok(())
    }

    async fn create_wallet(&self, _options: &WalletOptions) -> Result<()> {
        Ok(())
    }

    async fn balance(&self) -> Result<u64> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn new_address(&self) -> Result<String> {
        Ok("bcrt1qfixture".to_string())
    }

    async fn generate_to_address(&self, blocks: u32, _address: &str) -> Result<()> {
        self.balance.fetch_add(u64::from(blocks) * 25, Ordering::SeqCst);
        self.height.fetch_add(u64::from(blocks), Ordering::SeqCst);
        Ok(())
    }

    async fn block_count(&self) -> Result<u64> {
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    fn rpc_endpoint(&self) -> String {
        "127.0.0.1:18443".to_string()
    }
}

#[tokio::test]
async fn test_network_builds_against_synced_node() {
    let dir = tempfile::tempdir().unwrap();

    let mut node = NodeHandle::new(
        dir.path().join("bitcoind"),
        FundingNode {
            balance: AtomicU64::new(0),
            height: AtomicU64::new(0),
        },
        SyncParams {
            poll_interval: std::time::Duration::from_millis(1),
            poll_cap: 20,
            ..Default::default()
        },
    );
    node.start().await.unwrap();
    assert!(node.is_synced());

    let (spawner, _counters) = SpySpawner::new();
    let mut network = VaultNetwork::build(
        dir.path(),
        &node.rpc_endpoint(),
        Some(&creds()),
        &NetworkTopology::default(),
        &spawner,
        &mut ports(),
    )
    .unwrap();

    network.start_all().await.unwrap();
    network.cleanup().await.unwrap();
    node.cleanup().await.unwrap();
}
