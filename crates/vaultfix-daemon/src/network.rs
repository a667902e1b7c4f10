//! Multi-party vault network factory.
//!
//! Composes several vault daemons (the topology's role mix) against one
//! already funded+synced blockchain node and an external relational store.
//! The store credentials are a hard precondition checked before any handle
//! exists, so a foreseeable misconfiguration never leaks a half-started
//! process tree.

use std::path::{Path, PathBuf};

use vaultfix_core::PostgresCreds;

use crate::error::{DaemonError, Result};
use crate::keys::{CoordinatorKey, SecretSeed};
use crate::roster::ParticipantRoster;
use crate::vaultd::{
    Endpoint, ManagerConfig, ManagerHandle, Role, StakeholderConfig, StakeholderHandle,
    VaultDaemon, VaultdParams, VaultdProcess,
};

/// Role mix and policy parameters for one network.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    /// Number of stakeholder daemons.
    pub n_stakeholders: usize,
    /// Number of manager daemons.
    pub n_managers: usize,
    /// Timelock, in confirmations.
    pub csv: u32,
}

impl Default for NetworkTopology {
    /// The reference topology: 2 stakeholders, 3 managers, csv 35.
    fn default() -> Self {
        Self {
            n_stakeholders: 2,
            n_managers: 3,
            csv: 35,
        }
    }
}

impl NetworkTopology {
    /// Validates the topology.
    ///
    /// # Errors
    /// Returns a configuration error on an empty role set.
    pub fn validate(&self) -> Result<()> {
        if self.n_stakeholders == 0 || self.n_managers == 0 {
            return Err(DaemonError::config(
                "a network needs at least one stakeholder and one manager",
            ));
        }
        if self.csv == 0 {
            return Err(DaemonError::config("csv timelock must be at least 1"));
        }
        Ok(())
    }
}

/// Collaborator that turns role parameters into a daemon handle.
///
/// The production spawner wires in real process wrappers; tests substitute
/// spies to observe composition without spawning anything.
pub trait VaultdSpawner: Send + Sync {
    /// Builds a stakeholder daemon.
    fn spawn_stakeholder(
        &self,
        params: VaultdParams,
        config: StakeholderConfig,
    ) -> Result<Box<dyn VaultDaemon>>;

    /// Builds a manager daemon.
    fn spawn_manager(
        &self,
        params: VaultdParams,
        config: ManagerConfig,
    ) -> Result<Box<dyn VaultDaemon>>;
}

/// Spawner producing the real role handles over caller-supplied process
/// wrappers.
pub struct ProcessSpawner<F>
where
    F: Fn(Role, &VaultdParams) -> Box<dyn VaultdProcess> + Send + Sync,
{
    make_process: F,
}

impl<F> ProcessSpawner<F>
where
    F: Fn(Role, &VaultdParams) -> Box<dyn VaultdProcess> + Send + Sync,
{
    /// Creates a spawner from a process-wrapper factory.
    pub const fn new(make_process: F) -> Self {
        Self { make_process }
    }
}

impl<F> VaultdSpawner for ProcessSpawner<F>
where
    F: Fn(Role, &VaultdParams) -> Box<dyn VaultdProcess> + Send + Sync,
{
    fn spawn_stakeholder(
        &self,
        params: VaultdParams,
        config: StakeholderConfig,
    ) -> Result<Box<dyn VaultDaemon>> {
        let process = (self.make_process)(Role::Stakeholder, &params);
        Ok(Box::new(StakeholderHandle::new(params, config, process)?))
    }

    fn spawn_manager(
        &self,
        params: VaultdParams,
        config: ManagerConfig,
    ) -> Result<Box<dyn VaultDaemon>> {
        let process = (self.make_process)(Role::Manager, &params);
        Ok(Box::new(ManagerHandle::new(params, config, process)?))
    }
}

/// A composed multi-party network of vault daemons.
pub struct VaultNetwork {
    datadir: PathBuf,
    daemons: Vec<Box<dyn VaultDaemon>>,
    started: usize,
}

impl std::fmt::Debug for VaultNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultNetwork")
            .field("datadir", &self.datadir)
            .field("daemons", &self.daemons.len())
            .field("started", &self.started)
            .finish()
    }
}

impl VaultNetwork {
    /// Composes a network under `dir`, sharing one node endpoint.
    ///
    /// Checks the relational-store credentials first and fails fast with a
    /// descriptive configuration error if any of the three fields is
    /// missing; no daemon handle is constructed in that case. The node
    /// endpoint should come from an already funded+synced
    /// [`NodeHandle`](crate::node::NodeHandle): daemon start-up depends on a
    /// reachable, funded node.
    ///
    /// # Errors
    /// Returns a configuration error on missing credentials, a bad
    /// topology, or exhausted reserved ports.
    pub fn build(
        dir: &Path,
        node_endpoint: &str,
        creds: Option<&PostgresCreds>,
        topology: &NetworkTopology,
        spawner: &dyn VaultdSpawner,
        ports: &mut dyn Iterator<Item = u16>,
    ) -> Result<Self> {
        let creds = creds.ok_or_else(|| {
            DaemonError::config(
                "please set the POSTGRES_USER, POSTGRES_PASS and POSTGRES_HOST \
                 environment variables",
            )
        })?;
        creds
            .validate()
            .map_err(|e| DaemonError::config(e.to_string()))?;
        topology.validate()?;

        let datadir = dir.join("revaultd");
        std::fs::create_dir_all(&datadir)?;

        let roster = ParticipantRoster::generate(topology.n_stakeholders, topology.n_managers);
        let coordinator = CoordinatorKey::well_known();
        let mut next_port = || {
            ports
                .next()
                .ok_or_else(|| DaemonError::config("ran out of reserved ports"))
        };

        let mut daemons: Vec<Box<dyn VaultDaemon>> = Vec::new();

        for keychain in &roster.stakeholders {
            let params = VaultdParams {
                datadir: datadir.clone(),
                roster: roster.clone(),
                n_stakeholders: topology.n_stakeholders,
                n_managers: topology.n_managers,
                csv: topology.csv,
                seed: SecretSeed::random(),
                coordinator: coordinator.clone(),
                port: next_port()?,
                node_endpoint: node_endpoint.to_string(),
            };
            let config = StakeholderConfig {
                keychain: keychain.clone(),
                watchtowers: vec![Endpoint::new("127.0.0.1:1")],
            };
            daemons.push(spawner.spawn_stakeholder(params, config)?);
        }

        for keychain in &roster.managers {
            let params = VaultdParams {
                datadir: datadir.clone(),
                roster: roster.clone(),
                n_stakeholders: topology.n_stakeholders,
                n_managers: topology.n_managers,
                csv: topology.csv,
                seed: SecretSeed::random(),
                coordinator: coordinator.clone(),
                port: next_port()?,
                node_endpoint: node_endpoint.to_string(),
            };
            // One cosigner endpoint per stakeholder, each with a one-time key.
            let config = ManagerConfig {
                keychain: keychain.clone(),
                cosigners: roster
                    .cosigners
                    .iter()
                    .map(|_| Endpoint::new("127.0.0.1:1"))
                    .collect(),
            };
            daemons.push(spawner.spawn_manager(params, config)?);
        }

        tracing::info!(
            datadir = %datadir.display(),
            stakeholders = topology.n_stakeholders,
            managers = topology.n_managers,
            "composed vault network"
        );

        Ok(Self {
            datadir,
            daemons,
            started: 0,
        })
    }

    /// Returns the network's data directory.
    #[must_use]
    pub fn datadir(&self) -> &Path {
        &self.datadir
    }

    /// Returns the composed daemons.
    #[must_use]
    pub fn daemons(&self) -> &[Box<dyn VaultDaemon>] {
        &self.daemons
    }

    /// Returns how many daemons are currently started.
    ///
    /// Zero before `start_all`, the full daemon count after it succeeds,
    /// and back to zero after a failed start or a cleanup.
    #[must_use]
    pub fn started(&self) -> usize {
        self.started
    }

    /// Starts every daemon in composition order.
    ///
    /// On the first start failure, every already-started sibling is cleaned
    /// up (continuing past individual cleanup failures) before the original
    /// error propagates. No half-built network is ever yielded.
    ///
    /// # Errors
    /// Returns the first start failure.
    pub async fn start_all(&mut self) -> Result<()> {
        for i in 0..self.daemons.len() {
            if let Err(e) = self.daemons[i].start().await {
                tracing::error!(
                    role = %self.daemons[i].role(),
                    index = i,
                    error = %e,
                    "daemon failed to start, tearing down started siblings"
                );
                for daemon in &mut self.daemons[..i] {
                    if let Err(cleanup_err) = daemon.cleanup().await {
                        tracing::warn!(
                            role = %daemon.role(),
                            error = %cleanup_err,
                            "sibling cleanup failed"
                        );
                    }
                }
                self.started = 0;
                return Err(e);
            }
            self.started = i + 1;
        }
        tracing::info!(daemons = self.daemons.len(), "vault network started");
        Ok(())
    }

    /// Tears down every composed daemon.
    ///
    /// Continues through individual failures so one stuck daemon cannot
    /// strand its siblings, then reports the first failure.
    ///
    /// # Errors
    /// Returns the first cleanup failure encountered.
    pub async fn cleanup(&mut self) -> Result<()> {
        let mut first_err = None;
        for daemon in &mut self.daemons {
            if let Err(e) = daemon.cleanup().await {
                tracing::warn!(role = %daemon.role(), error = %e, "daemon cleanup failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        self.started = 0;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
