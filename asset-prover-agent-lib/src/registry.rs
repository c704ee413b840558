//! Verification key registries and the hash → circuit lookup.

use crate::error::{Error, Result};
use crate::types::{NetworkId, VerificationKeyEntry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Expected verification keys, one list for mainnet and one shared by every
/// other network. Loaded once at startup and never modified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationKeyRegistry {
    #[serde(default)]
    pub mainnet: Vec<VerificationKeyEntry>,
    #[serde(default)]
    pub testnet: Vec<VerificationKeyEntry>,
}

impl VerificationKeyRegistry {
    pub fn new(mainnet: Vec<VerificationKeyEntry>, testnet: Vec<VerificationKeyEntry>) -> Self {
        Self { mainnet, testnet }
    }

    /// Loads a registry from a TOML file with `[[mainnet]]` and `[[testnet]]`
    /// tables of `{ key, hash, kind }`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let registry: Self = toml::from_str(&contents)?;
        info!(
            path = %path.display(),
            mainnet = registry.mainnet.len(),
            testnet = registry.testnet.len(),
            "Loaded verification key registry"
        );
        Ok(registry)
    }

    pub fn for_network(&self, chain: NetworkId) -> &[VerificationKeyEntry] {
        match chain {
            NetworkId::Mainnet => &self.mainnet,
            _ => &self.testnet,
        }
    }
}

/// Finds the registry entry whose expected hash is `hash`.
///
/// Registries hold a few dozen entries at most, so this is a plain scan.
pub fn resolve<'a>(
    hash: &str,
    registry: &'a [VerificationKeyEntry],
) -> Result<&'a VerificationKeyEntry> {
    registry
        .iter()
        .find(|entry| entry.expected_hash == hash)
        .ok_or_else(|| Error::KeyNotFound(hash.to_string()))
}
