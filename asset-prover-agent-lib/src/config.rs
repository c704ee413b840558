use crate::builder::ProvingFee;
use crate::error::{Error, Result};
use crate::network::RetryPolicy;
use crate::types::TransactionType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "AGENT_CONFIG";
/// Public key the proving fee is paid to. Jobs fail without it.
pub const WALLET_ENV: &str = "WALLET";
pub const REGISTRY_PATH_ENV: &str = "AGENT_REGISTRY";
pub const TOOLKIT_URL_ENV: &str = "AGENT_TOOLKIT_URL";
pub const GRAPHQL_URL_ENV: &str = "AGENT_GRAPHQL_URL";
pub const METADATA_URL_ENV: &str = "AGENT_METADATA_URL";

/// Proving fee charged for launches and mints, in nanomina.
pub const DEFAULT_LAUNCH_FEE: u64 = 1_000_000_000;
/// Proving fee charged for every other transaction, in nanomina.
pub const DEFAULT_TRANSACTION_FEE: u64 = 100_000_000;
/// Batch output size above which a warning is logged.
pub const DEFAULT_PROOF_SIZE_WARNING: usize = 350_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub wallet: Option<String>,
    pub registry_path: Option<PathBuf>,
    pub launch_fee: u64,
    pub transaction_fee: u64,
    pub proof_size_warning: usize,
    pub retry: RetryPolicy,
    // Remote collaborators, used by the binary
    pub toolkit_url: Option<Url>,
    pub graphql_url: Option<Url>,
    pub metadata_url: Option<Url>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wallet: None,
            registry_path: None,
            launch_fee: DEFAULT_LAUNCH_FEE,
            transaction_fee: DEFAULT_TRANSACTION_FEE,
            proof_size_warning: DEFAULT_PROOF_SIZE_WARNING,
            retry: RetryPolicy::default(),
            toolkit_url: None,
            graphql_url: None,
            metadata_url: None,
        }
    }
}

impl AgentConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the file named by [`CONFIG_PATH_ENV`] if set, then applies
    /// environment overrides.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(wallet) = lookup(WALLET_ENV) {
            config.wallet = Some(wallet);
        }
        if let Some(path) = lookup(REGISTRY_PATH_ENV) {
            config.registry_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup(TOOLKIT_URL_ENV) {
            config.toolkit_url = Some(Url::parse(&url)?);
        }
        if let Some(url) = lookup(GRAPHQL_URL_ENV) {
            config.graphql_url = Some(Url::parse(&url)?);
        }
        if let Some(url) = lookup(METADATA_URL_ENV) {
            config.metadata_url = Some(Url::parse(&url)?);
        }

        debug!(?config, "Loaded agent configuration");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn wallet(&self) -> Result<&str> {
        self.wallet
            .as_deref()
            .filter(|wallet| !wallet.is_empty())
            .ok_or(Error::MissingWalletConfiguration)
    }

    pub fn proving_fee(&self, tx_type: TransactionType) -> Result<ProvingFee> {
        let proving_fee = if tx_type.uses_launch_fee() {
            self.launch_fee
        } else {
            self.transaction_fee
        };
        Ok(ProvingFee {
            proving_key: self.wallet()?.to_string(),
            proving_fee,
        })
    }

    pub fn registry_path(&self) -> Result<&Path> {
        self.registry_path
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", REGISTRY_PATH_ENV)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkId;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AgentConfig::default());
        assert!(matches!(
            config.wallet(),
            Err(Error::MissingWalletConfiguration)
        ));
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
wallet = "B62file"
launch_fee = 5
registry_path = "/etc/agent/registry.toml"

[retry]
window_secs = 30
networks = ["zeko", "devnet"]
"#
        )
        .unwrap();

        let config = AgentConfig::from_lookup(lookup(&[
            (CONFIG_PATH_ENV, file.path().display().to_string()),
            (WALLET_ENV, "B62env".to_string()),
            (GRAPHQL_URL_ENV, "http://localhost:8080/graphql".to_string()),
        ]))
        .unwrap();

        assert_eq!(config.wallet().unwrap(), "B62env");
        assert_eq!(config.launch_fee, 5);
        assert_eq!(config.transaction_fee, DEFAULT_TRANSACTION_FEE);
        assert_eq!(config.retry.window_secs, 30);
        assert_eq!(config.retry.interval_secs, 10);
        assert!(config.retry.retries_on(NetworkId::Devnet));
        assert_eq!(
            config.registry_path().unwrap(),
            Path::new("/etc/agent/registry.toml")
        );
        assert_eq!(config.graphql_url.unwrap().path(), "/graphql");
    }

    #[test]
    fn empty_wallet_counts_as_missing() {
        let config = AgentConfig::from_lookup(lookup(&[(WALLET_ENV, String::new())])).unwrap();
        assert!(matches!(
            config.proving_fee(TransactionType::Mint),
            Err(Error::MissingWalletConfiguration)
        ));
    }

    #[test]
    fn launches_and_mints_pay_launch_fee() {
        let config = AgentConfig {
            wallet: Some("B62wallet".into()),
            ..Default::default()
        };
        let fee = config.proving_fee(TransactionType::LaunchCollection).unwrap();
        assert_eq!(fee.proving_fee, DEFAULT_LAUNCH_FEE);
        assert_eq!(fee.proving_key, "B62wallet");
        assert_eq!(
            config.proving_fee(TransactionType::Mint).unwrap().proving_fee,
            DEFAULT_LAUNCH_FEE
        );
        assert_eq!(
            config.proving_fee(TransactionType::Transfer).unwrap().proving_fee,
            DEFAULT_TRANSACTION_FEE
        );
    }
}
