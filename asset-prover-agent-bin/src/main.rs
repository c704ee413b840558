use asset_prover_agent_lib::config::AgentConfig;
use asset_prover_agent_lib::host::{JobContext, WorkerHost};
use asset_prover_agent_lib::registry::VerificationKeyRegistry;
use asset_prover_agent_lib::remote::{GraphQlNetworkClient, HttpMetadataPublisher, HttpToolkit};
use asset_prover_agent_lib::types::TransactionMetadata;
use asset_prover_agent_lib::{AgentContext, Collaborators, ProvingAgent};
use async_trait::async_trait;
use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Exit status that tells the supervisor to spawn a fresh worker.
const RESTART_EXIT_CODE: i32 = 75;
/// How long pending metadata publications may delay shutdown.
const METADATA_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    #[serde(flatten)]
    context: JobContext,
    requests: Vec<Value>,
}

impl Job {
    // Requests may arrive pre-serialized or as plain JSON objects
    fn serialized_requests(&self) -> Vec<String> {
        self.requests
            .iter()
            .map(|request| match request {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Host for a worker running as a standalone process.
struct ProcessHost {
    publisher: Option<HttpMetadataPublisher>,
}

impl ProcessHost {
    async fn flush(&self) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        match publisher.flush(METADATA_FLUSH_TIMEOUT).await {
            Ok(0) => {}
            Ok(abandoned) => tracing::warn!(abandoned, "Metadata publications abandoned"),
            Err(e) => tracing::warn!(error = %e, "Failed to flush metadata publications"),
        }
    }
}

#[async_trait]
impl WorkerHost for ProcessHost {
    async fn force_worker_restart(&self) -> asset_prover_agent_lib::Result<()> {
        tracing::error!(
            code = RESTART_EXIT_CODE,
            "Compiled circuits are unusable, restarting worker"
        );
        std::process::exit(RESTART_EXIT_CODE)
    }

    fn publish_transaction_metadata(&self, tx_id: Option<&str>, metadata: TransactionMetadata) {
        match &self.publisher {
            Some(publisher) => publisher.publish(tx_id, metadata),
            None => tracing::info!(?tx_id, ?metadata, "Transaction metadata"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // stdout carries the job result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::load().context("Loading agent configuration")?;
    let registry = VerificationKeyRegistry::load(config.registry_path()?)
        .context("Loading verification key registry")?;

    let toolkit_url = config
        .toolkit_url
        .clone()
        .ok_or_else(|| eyre!("AGENT_TOOLKIT_URL is not set"))?;
    let graphql_url = config
        .graphql_url
        .clone()
        .ok_or_else(|| eyre!("AGENT_GRAPHQL_URL is not set"))?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Reading job from stdin")?;
    let job: Job = serde_json::from_str(&input).context("Parsing job")?;

    let host = Arc::new(ProcessHost {
        publisher: config.metadata_url.clone().map(HttpMetadataPublisher::new),
    });
    let toolkit = Arc::new(HttpToolkit::new(toolkit_url));
    let network = GraphQlNetworkClient::new(graphql_url)
        .tracking_inclusion(job.context.is_local_network);
    let collaborators = Collaborators {
        host: host.clone(),
        builder: toolkit.clone(),
        circuits: toolkit.clone(),
        prover: toolkit,
        network: Arc::new(network),
    };
    let ctx = AgentContext::new(config, registry, collaborators);

    tracing::info!(
        task = %job.context.task,
        chain = %job.context.chain,
        "Starting asset prover agent..."
    );
    let requests = job.serialized_requests();
    let agent = ProvingAgent::new(ctx, job.context);
    let output = agent.execute(&requests).await;
    host.flush().await;

    if let Some(output) = output? {
        println!("{}", output);
    }

    Ok(())
}
