#![allow(dead_code)]

use asset_prover_agent_lib::builder::{BuiltTransaction, ProvingFee, TransactionBuilder};
use asset_prover_agent_lib::compiler::CircuitCompiler;
use asset_prover_agent_lib::config::AgentConfig;
use asset_prover_agent_lib::host::WorkerHost;
use asset_prover_agent_lib::network::NetworkClient;
use asset_prover_agent_lib::prover::ProofBackend;
use asset_prover_agent_lib::registry::VerificationKeyRegistry;
use asset_prover_agent_lib::types::{
    AdminVariant, CircuitId, CircuitKind, CompiledKey, NetworkId, ProvedTransaction,
    SubmissionOutcome, TransactionMetadata, TransactionParams, TransactionRequest, TxStatus,
    UnprovenTransaction, VerificationKeyEntry,
};
use asset_prover_agent_lib::{AgentContext, Collaborators, Error, JobResult, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WALLET: &str = "B62wallet";
pub const ASSET_HASH: &str = "asset-hash";
pub const ADMIN_HASH: &str = "admin-hash";

pub fn registry() -> VerificationKeyRegistry {
    let entries = vec![
        VerificationKeyEntry {
            circuit_key: "Collection".into(),
            expected_hash: ASSET_HASH.into(),
            kind: CircuitKind::PrimaryAsset,
        },
        VerificationKeyEntry {
            circuit_key: "AdminStandard".into(),
            expected_hash: ADMIN_HASH.into(),
            kind: CircuitKind::AdminStandard,
        },
    ];
    VerificationKeyRegistry::new(entries.clone(), entries)
}

/// Builder, circuits and prover in one, recording every call.
#[derive(Default)]
pub struct FakeToolkit {
    // Overrides the signer recovered from the payload
    pub signer: Option<String>,
    // Overrides the hash a circuit compiles to
    pub compiled_hashes: HashMap<String, String>,
    pub param_calls: AtomicUsize,
    pub builds: AtomicUsize,
    pub compiled: Mutex<Vec<CircuitId>>,
}

impl FakeToolkit {
    pub fn compiles_of(&self, name: &str) -> usize {
        self.compiled
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name == name)
            .count()
    }

    fn built(&self, request: &TransactionRequest) -> BuiltTransaction {
        self.builds.fetch_add(1, Ordering::SeqCst);
        BuiltTransaction {
            tx: UnprovenTransaction(json!({
                "txType": request.tx_type.as_str(),
                "sender": request.sender,
            })),
            admin_variant: AdminVariant::Standard,
            required_hashes: vec![ASSET_HASH.into(), ADMIN_HASH.into()],
            symbol: request.symbol.clone(),
            name: request.params.collection_name.clone(),
            admin_contract_address: request.params.admin_contract_address.clone(),
        }
    }
}

#[async_trait]
impl TransactionBuilder for FakeToolkit {
    async fn transaction_params(&self, request: &TransactionRequest) -> Result<TransactionParams> {
        self.param_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionParams {
            fee: 100_000_000,
            sender: self.signer.clone().unwrap_or_else(|| request.sender.clone()),
            nonce: request.nonce.unwrap_or_default(),
            memo: format!("{} memo", request.tx_type),
        })
    }

    async fn build_launch(
        &self,
        _chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction> {
        assert_eq!(fee.proving_key, WALLET);
        Ok(self.built(request))
    }

    async fn build_mutation(
        &self,
        _chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction> {
        assert_eq!(fee.proving_key, WALLET);
        Ok(self.built(request))
    }
}

#[async_trait]
impl CircuitCompiler for FakeToolkit {
    async fn compile(&self, circuit: &CircuitId) -> Result<CompiledKey> {
        self.compiled.lock()?.push(circuit.clone());
        let hash = match self.compiled_hashes.get(&circuit.name) {
            Some(hash) => hash.clone(),
            None if circuit.kind.is_asset() => ASSET_HASH.to_string(),
            None => ADMIN_HASH.to_string(),
        };
        Ok(CompiledKey {
            hash,
            raw_data: format!("vk of {}", circuit),
        })
    }
}

#[async_trait]
impl ProofBackend for FakeToolkit {
    async fn prove(&self, tx: UnprovenTransaction) -> Result<ProvedTransaction> {
        Ok(ProvedTransaction::new(json!({ "proved": tx }).to_string()))
    }
}

/// Replays scripted send results; the last one repeats forever.
pub struct ScriptedNetwork {
    script: Mutex<VecDeque<Result<SubmissionOutcome>>>,
    last: Mutex<Option<SubmissionOutcome>>,
    pub sends: AtomicUsize,
    pub inclusion_waits: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new(script: Vec<Result<SubmissionOutcome>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            sends: AtomicUsize::new(0),
            inclusion_waits: AtomicUsize::new(0),
        }
    }

    pub fn always(outcome: SubmissionOutcome) -> Self {
        Self::new(vec![Ok(outcome)])
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

pub fn pending(hash: &str) -> SubmissionOutcome {
    SubmissionOutcome {
        hash: Some(hash.into()),
        status: TxStatus::Pending,
        errors: vec![],
    }
}

pub fn rejected(error: &str) -> SubmissionOutcome {
    SubmissionOutcome {
        hash: None,
        status: TxStatus::Rejected,
        errors: vec![error.into()],
    }
}

#[async_trait]
impl NetworkClient for ScriptedNetwork {
    async fn send(&self, _tx: &ProvedTransaction) -> Result<SubmissionOutcome> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock()?.pop_front();
        match next {
            Some(Ok(outcome)) => {
                *self.last.lock()? = Some(outcome.clone());
                Ok(outcome)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()?
                .clone()
                .ok_or_else(|| Error::Network("script exhausted".into())),
        }
    }

    async fn wait_for_inclusion(&self, outcome: &SubmissionOutcome) -> Result<SubmissionOutcome> {
        self.inclusion_waits.fetch_add(1, Ordering::SeqCst);
        Ok(SubmissionOutcome {
            status: TxStatus::Included,
            ..outcome.clone()
        })
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub restarts: AtomicUsize,
    pub published: Mutex<Vec<(Option<String>, TransactionMetadata)>>,
}

impl RecordingHost {
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<(Option<String>, TransactionMetadata)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn force_worker_restart(&self) -> Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn publish_transaction_metadata(&self, tx_id: Option<&str>, metadata: TransactionMetadata) {
        self.published
            .lock()
            .unwrap()
            .push((tx_id.map(str::to_string), metadata));
    }
}

pub struct Harness {
    pub ctx: AgentContext,
    pub toolkit: Arc<FakeToolkit>,
    pub network: Arc<ScriptedNetwork>,
    pub host: Arc<RecordingHost>,
}

impl Harness {
    pub fn new(toolkit: FakeToolkit, network: ScriptedNetwork) -> Self {
        Self::with_config(
            AgentConfig {
                wallet: Some(WALLET.into()),
                ..Default::default()
            },
            toolkit,
            network,
        )
    }

    pub fn with_config(
        config: AgentConfig,
        toolkit: FakeToolkit,
        network: ScriptedNetwork,
    ) -> Self {
        let toolkit = Arc::new(toolkit);
        let network = Arc::new(network);
        let host = Arc::new(RecordingHost::default());
        let ctx = AgentContext::new(
            config,
            registry(),
            Collaborators {
                host: host.clone(),
                builder: toolkit.clone(),
                circuits: toolkit.clone(),
                prover: toolkit.clone(),
                network: network.clone(),
            },
        );
        Self {
            ctx,
            toolkit,
            network,
            host,
        }
    }
}

pub fn launch_request() -> String {
    json!({
        "sender": "B62admin",
        "transaction": "{}",
        "signedData": "{}",
        "symbol": "PIX",
        "request": {
            "txType": "launch-collection",
            "collectionAddress": "B62collection",
            "adminContractAddress": "B62adminContract",
            "collectionName": "Pixels",
            "creator": "B62admin"
        }
    })
    .to_string()
}

pub fn mint_request() -> String {
    json!({
        "sender": "B62admin",
        "nonce": 1,
        "request": { "txType": "mint", "collectionAddress": "B62collection" }
    })
    .to_string()
}

pub fn transfer_request() -> Value {
    json!({
        "sender": "B62owner",
        "nonce": 3,
        "request": { "txType": "transfer", "collectionAddress": "B62collection" }
    })
}

/// Splits the batch output into per-transaction results.
pub fn results(output: &str) -> Vec<JobResult> {
    let output: Value = serde_json::from_str(output).unwrap();
    output["proofs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|proof| {
            let result: JobResult = serde_json::from_str(proof.as_str().unwrap()).unwrap();
            // A result never carries both the proof and its hash
            assert!(!(result.hash.is_some() && result.tx.is_some()));
            result
        })
        .collect()
}
