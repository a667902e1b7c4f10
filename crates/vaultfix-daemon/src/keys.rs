//! Opaque key material for test participants.
//!
//! Real key generation lives in external collaborators; the harness only
//! needs values that are unique per run and stable for the lifetime of one
//! daemon. Randomness comes from v4 UUIDs, which is plenty for fixtures.

use crate::error::{DaemonError, Result};

/// The shared coordinator identity of the reference configuration.
///
/// Every vault daemon in a network is configured to trust this fixed,
/// well-known public key for inter-party message relay.
pub const COORDINATOR_NOISE_KEY: &str =
    "d91563973102454a7830137e92d0548bc83b4ea2799f1df04622ca1307381402";

fn random_bytes() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes
}

/// A locally-generated secret seed for one daemon instance.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSeed([u8; 32]);

impl SecretSeed {
    /// Generates a fresh random seed.
    #[must_use]
    pub fn random() -> Self {
        Self(random_bytes())
    }

    /// Returns the raw seed bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log seed material.
        f.write_str("SecretSeed(..)")
    }
}

/// A one-time transport identity key for a counterpart endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseKey([u8; 32]);

impl NoiseKey {
    /// Generates a fresh one-time key.
    #[must_use]
    pub fn random() -> Self {
        Self(random_bytes())
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for NoiseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The coordinator's public identity, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorKey(String);

impl CoordinatorKey {
    /// Returns the fixed coordinator identity of the reference
    /// configuration.
    #[must_use]
    pub fn well_known() -> Self {
        Self(COORDINATOR_NOISE_KEY.to_string())
    }

    /// Creates a coordinator key from a hex string.
    ///
    /// # Errors
    /// Returns an error if the string is not 64 hex characters.
    pub fn new(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DaemonError::config(format!(
                "coordinator key must be 64 hex characters, got '{hex}'"
            )));
        }
        Ok(Self(hex))
    }

    /// Returns the hex-encoded key.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// An opaque per-participant key block, generated externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keychain([u8; 32]);

impl Keychain {
    /// Generates a fresh keychain for a test participant.
    #[must_use]
    pub fn random() -> Self {
        Self(random_bytes())
    }

    /// Returns the raw key block.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
