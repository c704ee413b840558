// Entry points the job-worker host calls on the agent

use crate::context::AgentContext;
use crate::error::{Error, Result};
use crate::host::JobContext;
use crate::types::{TransactionRequest, TransactionType};
use serde::Serialize;
use tracing::{info, warn};

// The only task this agent accepts.
pub const PROVE_TASK: &str = "prove";

// --- Job Handler Modules ---
pub mod launch;
pub mod pipeline;
pub mod transaction;

// Re-export handlers
pub use launch::launch;
pub use transaction::transaction;

#[derive(Debug, Serialize)]
struct BatchOutput {
    proofs: Vec<String>,
}

/// One agent instance per job, as the host creates them.
#[derive(Clone)]
pub struct ProvingAgent {
    ctx: AgentContext,
    job: JobContext,
}

impl ProvingAgent {
    pub fn new(ctx: AgentContext, job: JobContext) -> Self {
        Self { ctx, job }
    }

    /// Proves and submits a batch of serialized transaction requests, in
    /// order, and returns `{"proofs": [...]}` with one encoded result per
    /// request.
    ///
    /// Every request is validated before any of them is built, so a malformed
    /// request rejects the whole batch without touching the network.
    pub async fn execute(&self, requests: &[String]) -> Result<Option<String>> {
        if requests.is_empty() {
            return Err(Error::EmptyBatch);
        }
        if self.job.task != PROVE_TASK {
            return Err(Error::InvalidTask(self.job.task.clone()));
        }
        self.ctx.config().wallet()?;

        let requests = requests
            .iter()
            .map(|raw| TransactionRequest::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        info!(
            chain = %self.job.chain,
            count = requests.len(),
            "Executing transaction batch"
        );

        let mut proofs = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            info!(
                index,
                tx_type = %request.tx_type,
                sender = %request.sender,
                "Processing transaction"
            );
            let proof = match request.tx_type {
                TransactionType::LaunchCollection | TransactionType::LaunchToken => {
                    launch(&self.ctx, &self.job, request).await?
                }
                TransactionType::Mint
                | TransactionType::Transfer
                | TransactionType::Offer
                | TransactionType::Bid
                | TransactionType::Sell
                | TransactionType::Buy
                | TransactionType::WithdrawOffer
                | TransactionType::WithdrawBid
                | TransactionType::UpdateWhitelist
                | TransactionType::UpdateBidWhitelist
                | TransactionType::UpdateOfferWhitelist => {
                    transaction(&self.ctx, &self.job, request).await?
                }
            };
            proofs.push(proof);
        }

        let result = serde_json::to_string_pretty(&BatchOutput { proofs })?;
        info!(size = result.len(), "Proofs size");
        if result.len() > self.ctx.config().proof_size_warning {
            warn!(
                size = result.len(),
                limit = self.ctx.config().proof_size_warning,
                "Proofs size is too large"
            );
        }
        Ok(Some(result))
    }

    pub async fn create(&self, _transaction: &str) -> Result<Option<String>> {
        Err(Error::NotImplemented("create"))
    }

    pub async fn merge(&self, _proof1: &str, _proof2: &str) -> Result<Option<String>> {
        Err(Error::NotImplemented("merge"))
    }
}
