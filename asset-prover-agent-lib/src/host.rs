//! Services the job-worker host provides to the agent.

use crate::error::Result;
use crate::types::{NetworkId, TransactionMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-job context supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub task: String,
    pub chain: NetworkId,
    #[serde(default)]
    pub is_local_network: bool,
}

impl JobContext {
    pub fn prove(chain: NetworkId) -> Self {
        Self {
            task: "prove".to_string(),
            chain,
            is_local_network: matches!(chain, NetworkId::Local),
        }
    }
}

#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Terminates the current worker process so the host respawns a fresh one.
    async fn force_worker_restart(&self) -> Result<()>;

    /// Fire-and-forget publication of transaction metadata. Implementations
    /// must not block and must swallow their own failures.
    fn publish_transaction_metadata(&self, tx_id: Option<&str>, metadata: TransactionMetadata);
}
