use crate::error::{Error, Result};
use crate::types::{ProvedTransaction, UnprovenTransaction};
use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

/// Proof generation for an assembled transaction. Requires the circuits the
/// transaction depends on to be compiled first.
#[async_trait]
pub trait ProofBackend: Send + Sync {
    async fn prove(&self, tx: UnprovenTransaction) -> Result<ProvedTransaction>;
}

/// Proves a transaction through a [`ProofBackend`], timing the call.
pub struct Prover<'a> {
    backend: &'a dyn ProofBackend,
}

impl<'a> Prover<'a> {
    pub fn new(backend: &'a dyn ProofBackend) -> Self {
        Self { backend }
    }

    pub async fn prove(&self, label: &str, tx: UnprovenTransaction) -> Result<ProvedTransaction> {
        info!(%label, "Proving transaction...");
        let started = Instant::now();
        let proved = self.backend.prove(tx).await.map_err(|e| match e {
            Error::ProofGeneration(_) => e,
            other => Error::ProofGeneration(other.to_string()),
        })?;
        info!(
            %label,
            elapsed = ?started.elapsed(),
            size = proved.to_json().len(),
            "Proved transaction"
        );
        Ok(proved)
    }
}
