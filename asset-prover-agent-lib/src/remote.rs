//! HTTP adapters for the external collaborators.
//!
//! Circuits, transaction builders and the prover live in a toolkit sidecar
//! that speaks JSON over HTTP. Submission goes straight to a node's GraphQL
//! endpoint.

use crate::builder::{BuiltTransaction, ProvingFee, TransactionBuilder};
use crate::compiler::CircuitCompiler;
use crate::error::{Error, Result};
use crate::network::NetworkClient;
use crate::prover::ProofBackend;
use crate::types::{
    CircuitId, CompiledKey, NetworkId, ProvedTransaction, SubmissionOutcome, TransactionMetadata,
    TransactionParams, TransactionRequest, TxStatus, UnprovenTransaction,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

const SEND_ZKAPP: &str =
    "mutation($input: SendZkappInput!) { sendZkapp(input: $input) { zkapp { hash id } } }";
const TRANSACTION_STATUS: &str =
    "query($id: ID!) { transactionStatus(zkappTransaction: $id) }";

// Url::join drops the last path segment unless the base ends with a slash
fn as_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn post_json<Req, Resp>(client: &Client, url: Url, body: &Req) -> Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = client.post(url.clone()).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::Validation(text)
            }
            _ => Error::Network(format!("{} returned {}: {}", url, status, text)),
        });
    }
    Ok(response.json().await?)
}

/// Client for the toolkit sidecar that owns the circuits and builders.
#[derive(Debug, Clone)]
pub struct HttpToolkit {
    client: Client,
    base: Url,
}

impl HttpToolkit {
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base: as_base(base),
        }
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.base.join(path)?;
        debug!(%url, "Calling toolkit");
        post_json(&self.client, url, body).await
    }

    async fn build(
        &self,
        path: &str,
        chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction> {
        let body = json!({
            "chain": chain,
            "request": request.raw,
            "provingKey": fee.proving_key,
            "provingFee": fee.proving_fee,
        });
        self.post(path, &body).await
    }
}

#[async_trait]
impl TransactionBuilder for HttpToolkit {
    async fn transaction_params(&self, request: &TransactionRequest) -> Result<TransactionParams> {
        self.post("params", &json!({ "request": request.raw })).await
    }

    async fn build_launch(
        &self,
        chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction> {
        self.build("build/launch", chain, request, fee).await
    }

    async fn build_mutation(
        &self,
        chain: NetworkId,
        request: &TransactionRequest,
        fee: &ProvingFee,
    ) -> Result<BuiltTransaction> {
        self.build("build/mutation", chain, request, fee).await
    }
}

#[async_trait]
impl CircuitCompiler for HttpToolkit {
    async fn compile(&self, circuit: &CircuitId) -> Result<CompiledKey> {
        self.post("compile", circuit)
            .await
            .map_err(|e| Error::CircuitCompilation(format!("{}: {}", circuit, e)))
    }
}

#[async_trait]
impl ProofBackend for HttpToolkit {
    async fn prove(&self, tx: UnprovenTransaction) -> Result<ProvedTransaction> {
        let response: Value = self.post("prove", &json!({ "tx": tx })).await?;
        match response.get("tx") {
            Some(Value::String(json)) => Ok(ProvedTransaction::new(json.clone())),
            Some(payload) => Ok(ProvedTransaction::new(payload.to_string())),
            None => Err(Error::ProofGeneration(
                "toolkit response has no tx field".to_string(),
            )),
        }
    }
}

/// Submits proved transactions through a node's GraphQL API.
#[derive(Debug)]
pub struct GraphQlNetworkClient {
    client: Client,
    endpoint: Url,
    poll_interval: Duration,
    track_inclusion: bool,
    // GraphQL status queries take the command id, not its hash
    ids: Mutex<HashMap<String, String>>,
}

impl GraphQlNetworkClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_poll_interval(endpoint, Duration::from_secs(5))
    }

    pub fn with_poll_interval(endpoint: Url, poll_interval: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            poll_interval,
            track_inclusion: false,
            ids: Mutex::new(HashMap::new()),
        }
    }

    /// Remembers command ids of accepted sends so `wait_for_inclusion` can
    /// query them. Only enable where inclusion is awaited.
    pub fn tracking_inclusion(mut self, enabled: bool) -> Self {
        self.track_inclusion = enabled;
        self
    }

    async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        post_json(
            &self.client,
            self.endpoint.clone(),
            &json!({ "query": query, "variables": variables }),
        )
        .await
    }
}

fn graphql_errors(response: &Value) -> Vec<String> {
    response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl NetworkClient for GraphQlNetworkClient {
    async fn send(&self, tx: &ProvedTransaction) -> Result<SubmissionOutcome> {
        let response = self
            .query(SEND_ZKAPP, json!({ "input": { "zkappCommand": tx.payload()? } }))
            .await?;

        let errors = graphql_errors(&response);
        let zkapp = &response["data"]["sendZkapp"]["zkapp"];
        let hash = zkapp["hash"].as_str().map(str::to_string);
        let status = match (&hash, errors.is_empty()) {
            (Some(hash), true) => {
                if self.track_inclusion {
                    if let Some(id) = zkapp["id"].as_str() {
                        self.ids.lock()?.insert(hash.clone(), id.to_string());
                    }
                }
                TxStatus::Pending
            }
            _ => TxStatus::Rejected,
        };
        Ok(SubmissionOutcome {
            hash,
            status,
            errors,
        })
    }

    async fn wait_for_inclusion(&self, outcome: &SubmissionOutcome) -> Result<SubmissionOutcome> {
        let hash = outcome
            .hash
            .clone()
            .ok_or_else(|| Error::Network("cannot wait for a transaction without hash".into()))?;
        let id = self
            .ids
            .lock()?
            .get(&hash)
            .cloned()
            .unwrap_or_else(|| hash.clone());

        let outcome = self.poll_status(hash.clone(), &id).await;
        self.ids.lock()?.remove(&hash);
        outcome
    }
}

impl GraphQlNetworkClient {
    async fn poll_status(&self, hash: String, id: &str) -> Result<SubmissionOutcome> {
        loop {
            let response = self.query(TRANSACTION_STATUS, json!({ "id": id })).await?;
            let errors = graphql_errors(&response);
            if !errors.is_empty() {
                return Ok(SubmissionOutcome {
                    hash: Some(hash),
                    status: TxStatus::Rejected,
                    errors,
                });
            }
            match response["data"]["transactionStatus"].as_str() {
                Some("INCLUDED") => {
                    return Ok(SubmissionOutcome {
                        hash: Some(hash),
                        status: TxStatus::Included,
                        errors,
                    });
                }
                Some("PENDING") => tokio::time::sleep(self.poll_interval).await,
                other => {
                    warn!(%hash, status = ?other, "Transaction dropped");
                    let status = other.unwrap_or("missing");
                    return Ok(SubmissionOutcome {
                        hash: Some(hash),
                        status: TxStatus::Rejected,
                        errors: vec![format!("transaction status {}", status)],
                    });
                }
            }
        }
    }
}

async fn post_metadata(
    client: &Client,
    endpoint: Url,
    tx_id: Option<&str>,
    metadata: &TransactionMetadata,
) -> Result<()> {
    let response = client
        .post(endpoint)
        .json(&json!({ "txId": tx_id, "metadata": metadata }))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(Error::Network(format!(
            "metadata endpoint returned {}",
            response.status()
        )));
    }
    Ok(())
}

/// Posts transaction metadata to an indexing service.
#[derive(Debug, Clone)]
pub struct HttpMetadataPublisher {
    client: Client,
    endpoint: Url,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl HttpMetadataPublisher {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub async fn post(&self, tx_id: Option<&str>, metadata: &TransactionMetadata) -> Result<()> {
        post_metadata(&self.client, self.endpoint.clone(), tx_id, metadata).await
    }

    /// Posts in a background task; failures are logged and dropped. Call
    /// [`flush`](Self::flush) before the runtime shuts down.
    pub fn publish(&self, tx_id: Option<&str>, metadata: TransactionMetadata) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let tx_id = tx_id.map(str::to_string);

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            if let Err(e) = post_metadata(&client, endpoint, tx_id.as_deref(), &metadata).await {
                warn!(error = %e, tx_id = ?tx_id, "Failed to publish transaction metadata");
            }
        });
    }

    /// Waits up to `limit` for publications still in flight and returns how
    /// many were abandoned.
    pub async fn flush(&self, limit: Duration) -> Result<usize> {
        let mut in_flight = std::mem::take(&mut *self.in_flight.lock()?);
        let drained = tokio::time::timeout(limit, async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Metadata publication task failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(remaining = in_flight.len(), "Abandoning metadata publications");
        }
        Ok(in_flight.len())
    }
}
