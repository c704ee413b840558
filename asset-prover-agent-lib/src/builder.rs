//! Port to the external transaction builders.

use crate::error::Result;
use crate::types::{
    AdminVariant, NetworkId, TransactionParams, TransactionRequest, UnprovenTransaction,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key and fee the prover charges for a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvingFee {
    pub proving_key: String,
    pub proving_fee: u64,
}

/// An unproven transaction plus everything needed to prove it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    pub tx: UnprovenTransaction,
    #[serde(default)]
    pub admin_variant: AdminVariant,
    #[serde(rename = "verificationKeyHashes")]
    pub required_hashes: Vec<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub admin_contract_address: Option<String>,
}

#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// Recovers fee, sender, nonce and memo from the request's signed payload.
    async fn transaction_params(&self, request: &TransactionRequest) -> Result<TransactionParams>;

    /// Assembles the deployment of a new collection or token, with the
    /// client's signatures applied.
    async fn build_launch(
        &self,
        chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction>;

    /// Assembles any non-launch operation, with the client's signatures
    /// applied.
    async fn build_mutation(
        &self,
        chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction>;
}
