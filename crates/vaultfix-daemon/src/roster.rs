//! Participant rosters for an m-of-n vault policy.

use crate::error::{DaemonError, Result};
use crate::keys::Keychain;

/// Three disjoint sets of participant key material.
///
/// Generation is the roster-generator collaborator's job; the handles only
/// validate that what they were given is consistent with the declared
/// policy. The reference topology pairs one cosigner with each stakeholder.
#[derive(Debug, Clone)]
pub struct ParticipantRoster {
    /// Stakeholder key blocks.
    pub stakeholders: Vec<Keychain>,
    /// Cosigner key blocks, one per stakeholder.
    pub cosigners: Vec<Keychain>,
    /// Manager key blocks.
    pub managers: Vec<Keychain>,
}

impl ParticipantRoster {
    /// Generates a roster for `n_stakeholders` and `n_managers`.
    #[must_use]
    pub fn generate(n_stakeholders: usize, n_managers: usize) -> Self {
        Self {
            stakeholders: (0..n_stakeholders).map(|_| Keychain::random()).collect(),
            cosigners: (0..n_stakeholders).map(|_| Keychain::random()).collect(),
            managers: (0..n_managers).map(|_| Keychain::random()).collect(),
        }
    }

    /// Validates the roster against a declared policy.
    ///
    /// # Errors
    /// Returns a configuration error if any set is empty or sized
    /// inconsistently with the policy.
    pub fn validate(&self, n_stakeholders: usize, n_managers: usize) -> Result<()> {
        if n_stakeholders == 0 || n_managers == 0 {
            return Err(DaemonError::config(
                "policy requires at least one stakeholder and one manager",
            ));
        }
        if self.stakeholders.len() != n_stakeholders {
            return Err(DaemonError::config(format!(
                "roster has {} stakeholders, policy declares {}",
                self.stakeholders.len(),
                n_stakeholders
            )));
        }
        if self.managers.len() != n_managers {
            return Err(DaemonError::config(format!(
                "roster has {} managers, policy declares {}",
                self.managers.len(),
                n_managers
            )));
        }
        if self.cosigners.len() != n_stakeholders {
            return Err(DaemonError::config(format!(
                "roster has {} cosigners for {} stakeholders",
                self.cosigners.len(),
                n_stakeholders
            )));
        }
        Ok(())
    }
}
