//! Vault daemon handles, one per participant role.
//!
//! The two role variants share a constructor contract and lifecycle,
//! differing only in the role-specific configuration block they accept: a
//! stakeholder watches the chain through its watchtowers, a manager spends
//! through its cosigners. Process spawning and readiness live behind the
//! [`VaultdProcess`] collaborator contract.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::keys::{CoordinatorKey, Keychain, NoiseKey, SecretSeed};
use crate::roster::ParticipantRoster;

/// Contract for the external daemon process wrapper.
#[async_trait]
pub trait VaultdProcess: Send + Sync {
    /// Spawns the daemon and blocks until it is ready to serve.
    async fn start(&mut self) -> Result<()>;

    /// Terminates the daemon; must be safe after a failed or partial start.
    async fn cleanup(&mut self) -> Result<()>;
}

/// A counterpart endpoint: an address plus a freshly generated one-time
/// transport identity.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Listening address, `host:port`.
    pub addr: String,
    /// One-time identity key for this counterpart.
    pub noise_key: NoiseKey,
}

impl Endpoint {
    /// Creates an endpoint with a fresh one-time key.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            noise_key: NoiseKey::random(),
        }
    }
}

/// Participant role within a vault network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Deposits and revocation authority.
    Stakeholder,
    /// Day-to-day spending authority.
    Manager,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stakeholder => f.write_str("stakeholder"),
            Self::Manager => f.write_str("manager"),
        }
    }
}

/// Constructor inputs shared by both role variants.
#[derive(Debug, Clone)]
pub struct VaultdParams {
    /// Daemon working directory.
    pub datadir: PathBuf,
    /// The network's participant rosters.
    pub roster: ParticipantRoster,
    /// Declared number of stakeholders in the policy.
    pub n_stakeholders: usize,
    /// Declared number of managers in the policy.
    pub n_managers: usize,
    /// Timelock, in confirmations (reference value: 35).
    pub csv: u32,
    /// Locally-generated secret seed.
    pub seed: SecretSeed,
    /// The shared coordinator identity.
    pub coordinator: CoordinatorKey,
    /// Reserved listening port.
    pub port: u16,
    /// RPC endpoint of the already-running blockchain node.
    pub node_endpoint: String,
}

impl VaultdParams {
    fn validate(&self) -> Result<()> {
        self.roster.validate(self.n_stakeholders, self.n_managers)?;
        if self.csv == 0 {
            return Err(crate::error::DaemonError::config(
                "csv timelock must be at least 1 confirmation",
            ));
        }
        if self.port == 0 {
            return Err(crate::error::DaemonError::config(
                "a reserved listening port is required",
            ));
        }
        Ok(())
    }
}

/// Stakeholder-specific configuration block.
#[derive(Debug, Clone)]
pub struct StakeholderConfig {
    /// This participant's own key identity.
    pub keychain: Keychain,
    /// Watchtower endpoints.
    pub watchtowers: Vec<Endpoint>,
}

/// Manager-specific configuration block.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// This participant's own key identity.
    pub keychain: Keychain,
    /// Cosigner endpoints.
    pub cosigners: Vec<Endpoint>,
}

/// Uniform lifecycle surface over both role variants, object-safe so a
/// network can hold a mixed set.
#[async_trait]
pub trait VaultDaemon: Send + Sync {
    /// This daemon's role.
    fn role(&self) -> Role;

    /// The reserved port the daemon is bound to.
    fn port(&self) -> u16;

    /// Starts the daemon, blocking until ready.
    async fn start(&mut self) -> Result<()>;

    /// Terminates the daemon; idempotent, safe after partial start.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Lifecycle state shared by both variants.
struct Inner {
    params: VaultdParams,
    process: Box<dyn VaultdProcess>,
    role: Role,
    cleaned: bool,
}

impl Inner {
    fn new(params: VaultdParams, process: Box<dyn VaultdProcess>, role: Role) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            process,
            role,
            cleaned: false,
        })
    }

    async fn start(&mut self) -> Result<()> {
        tracing::info!(
            role = %self.role,
            port = self.params.port,
            datadir = %self.params.datadir.display(),
            node = %self.params.node_endpoint,
            "starting vault daemon"
        );
        self.process.start().await
    }

    async fn cleanup(&mut self) -> Result<()> {
        if self.cleaned {
            return Ok(());
        }
        self.cleaned = true;
        tracing::debug!(role = %self.role, port = self.params.port, "cleaning up vault daemon");
        self.process.cleanup().await
    }
}

/// Handle to one stakeholder daemon.
pub struct StakeholderHandle {
    inner: Inner,
    config: StakeholderConfig,
}

impl StakeholderHandle {
    /// Creates a stakeholder handle, validating the roster against the
    /// declared policy before anything is spawned.
    ///
    /// # Errors
    /// Returns a configuration error on a malformed roster or parameters.
    pub fn new(
        params: VaultdParams,
        config: StakeholderConfig,
        process: Box<dyn VaultdProcess>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Inner::new(params, process, Role::Stakeholder)?,
            config,
        })
    }

    /// Returns the stakeholder configuration block.
    #[must_use]
    pub fn config(&self) -> &StakeholderConfig {
        &self.config
    }
}

#[async_trait]
impl VaultDaemon for StakeholderHandle {
    fn role(&self) -> Role {
        Role::Stakeholder
    }

    fn port(&self) -> u16 {
        self.inner.params.port
    }

    async fn start(&mut self) -> Result<()> {
        self.inner.start().await
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.inner.cleanup().await
    }
}

/// Handle to one manager daemon.
pub struct ManagerHandle {
    inner: Inner,
    config: ManagerConfig,
}

impl ManagerHandle {
    /// Creates a manager handle, validating the roster against the declared
    /// policy before anything is spawned.
    ///
    /// # Errors
    /// Returns a configuration error on a malformed roster or parameters.
    pub fn new(
        params: VaultdParams,
        config: ManagerConfig,
        process: Box<dyn VaultdProcess>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Inner::new(params, process, Role::Manager)?,
            config,
        })
    }

    /// Returns the manager configuration block.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

#[async_trait]
impl VaultDaemon for ManagerHandle {
    fn role(&self) -> Role {
        Role::Manager
    }

    fn port(&self) -> u16 {
        self.inner.params.port
    }

    async fn start(&mut self) -> Result<()> {
        self.inner.start().await
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.inner.cleanup().await
    }
}
