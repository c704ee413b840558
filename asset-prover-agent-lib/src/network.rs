use crate::error::Result;
use crate::host::WorkerHost;
use crate::result::JobResult;
use crate::types::{NetworkId, ProvedTransaction, SubmissionOutcome, TransactionMetadata, TxStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

/// Ledger client primitives used for submission.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn send(&self, tx: &ProvedTransaction) -> Result<SubmissionOutcome>;

    /// Blocks until the transaction is included. Only used on a local
    /// network, where inclusion is synchronous.
    async fn wait_for_inclusion(&self, outcome: &SubmissionOutcome) -> Result<SubmissionOutcome>;
}

/// When a non-pending send is retried.
///
/// Retries are bounded by wall-clock time since the first attempt, not by a
/// count, and only happen on networks whose mempool admission is
/// asynchronous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct RetryPolicy {
    pub window_secs: u64,
    pub interval_secs: u64,
    pub networks: Vec<NetworkId>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            window_secs: 60,
            interval_secs: 10,
            networks: vec![NetworkId::Zeko],
        }
    }
}

impl RetryPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retries_on(&self, chain: NetworkId) -> bool {
        self.networks.contains(&chain)
    }

    /// Upper bound on sends for one transaction on a retrying network.
    pub fn max_attempts(&self) -> u64 {
        if self.interval_secs == 0 {
            return u64::MAX;
        }
        self.window_secs.div_ceil(self.interval_secs) + 1
    }
}

#[derive(Debug)]
enum SubmitState {
    Attempting,
    Retrying(SubmissionOutcome),
    Sent(SubmissionOutcome),
    Failed(SubmissionOutcome),
}

/// Sends a proved transaction and turns the network's answer into a
/// [`JobResult`].
pub struct Submitter<'a> {
    client: &'a dyn NetworkClient,
    host: &'a dyn WorkerHost,
    policy: &'a RetryPolicy,
    chain: NetworkId,
    is_local_network: bool,
}

impl<'a> Submitter<'a> {
    pub fn new(
        client: &'a dyn NetworkClient,
        host: &'a dyn WorkerHost,
        policy: &'a RetryPolicy,
        chain: NetworkId,
        is_local_network: bool,
    ) -> Self {
        Self {
            client,
            host,
            policy,
            chain,
            is_local_network,
        }
    }

    /// Runs the submission state machine to completion.
    ///
    /// Errors are only returned when the network client itself fails; a
    /// rejected transaction is reported as an unsuccessful [`JobResult`].
    pub async fn submit(
        &self,
        tx: &ProvedTransaction,
        memo: &str,
        metadata: TransactionMetadata,
    ) -> Result<JobResult> {
        let started = Instant::now();
        let mut attempts: u64 = 0;
        let mut state = SubmitState::Attempting;

        loop {
            state = match state {
                SubmitState::Attempting => {
                    attempts += 1;
                    let outcome = self.client.send(tx).await?;
                    self.next_state(outcome, started.elapsed())
                }
                SubmitState::Retrying(outcome) => {
                    info!(
                        chain = %self.chain,
                        status = %outcome.status,
                        errors = ?outcome.errors,
                        attempts,
                        "Retrying tx"
                    );
                    sleep(self.policy.interval()).await;
                    SubmitState::Attempting
                }
                SubmitState::Sent(outcome) => {
                    info!(
                        %memo,
                        hash = ?outcome.hash,
                        status = %outcome.status,
                        attempts,
                        "tx sent"
                    );
                    return self.on_sent(tx, metadata, outcome).await;
                }
                SubmitState::Failed(outcome) => {
                    warn!(
                        %memo,
                        hash = ?outcome.hash,
                        status = %outcome.status,
                        errors = ?outcome.errors,
                        attempts,
                        elapsed = ?started.elapsed(),
                        "tx NOT sent"
                    );
                    return Ok(self.on_failed(tx, metadata, outcome));
                }
            };
        }
    }

    fn next_state(&self, outcome: SubmissionOutcome, elapsed: Duration) -> SubmitState {
        if outcome.status == TxStatus::Pending {
            SubmitState::Sent(outcome)
        } else if self.policy.retries_on(self.chain) && elapsed < self.policy.window() {
            SubmitState::Retrying(outcome)
        } else {
            SubmitState::Failed(outcome)
        }
    }

    async fn on_sent(
        &self,
        tx: &ProvedTransaction,
        metadata: TransactionMetadata,
        outcome: SubmissionOutcome,
    ) -> Result<JobResult> {
        if self.is_local_network {
            let included = match self.client.wait_for_inclusion(&outcome).await {
                Ok(included) => included,
                Err(e) => {
                    // Accepted but unconfirmed
                    warn!(hash = ?outcome.hash, error = %e, "Failed waiting for inclusion");
                    return Ok(JobResult {
                        success: false,
                        tx: Some(tx.to_json().to_string()),
                        hash: outcome.hash.clone(),
                        status: Some(outcome.status.to_string()),
                        error: Some(e.to_string()),
                    });
                }
            };
            info!(
                hash = ?included.hash,
                status = %included.status,
                "tx included into block"
            );
            return Ok(JobResult {
                success: included.status != TxStatus::Rejected,
                tx: Some(tx.to_json().to_string()),
                hash: included.hash.clone(),
                status: Some(included.status.to_string()),
                error: stringify_errors(&included.errors),
            });
        }

        if let Some(hash) = outcome.hash.as_deref() {
            self.publish(Some(hash), metadata, &outcome);
        }
        Ok(JobResult {
            success: outcome.hash.is_some(),
            tx: Some(tx.to_json().to_string()),
            hash: outcome.hash.clone(),
            status: Some(outcome.status.to_string()),
            error: stringify_errors(&outcome.errors),
        })
    }

    fn on_failed(
        &self,
        tx: &ProvedTransaction,
        metadata: TransactionMetadata,
        outcome: SubmissionOutcome,
    ) -> JobResult {
        self.publish(outcome.hash.as_deref(), metadata, &outcome);
        JobResult {
            success: false,
            tx: Some(tx.to_json().to_string()),
            hash: outcome.hash.clone(),
            status: Some(outcome.status.to_string()),
            error: Some(stringify_errors(&outcome.errors).unwrap_or_default()),
        }
    }

    fn publish(
        &self,
        tx_id: Option<&str>,
        mut metadata: TransactionMetadata,
        outcome: &SubmissionOutcome,
    ) {
        metadata.insert("txStatus".into(), Value::from(outcome.status.as_str()));
        metadata.insert("txErrors".into(), Value::from(outcome.errors.clone()));
        if let Some(hash) = outcome.hash.as_deref() {
            metadata.insert("txHash".into(), Value::from(hash));
        }
        self.host.publish_transaction_metadata(tx_id, metadata);
    }
}

fn stringify_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        serde_json::to_string(errors).ok()
    }
}
