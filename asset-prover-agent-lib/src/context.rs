use crate::builder::TransactionBuilder;
use crate::compiler::{CircuitCompiler, Compiler};
use crate::config::AgentConfig;
use crate::host::{JobContext, WorkerHost};
use crate::network::{NetworkClient, Submitter};
use crate::prover::{ProofBackend, Prover};
use crate::registry::VerificationKeyRegistry;
use crate::state::VerificationKeyCache;
use std::sync::Arc;

/// The external services a running agent talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub host: Arc<dyn WorkerHost>,
    pub builder: Arc<dyn TransactionBuilder>,
    pub circuits: Arc<dyn CircuitCompiler>,
    pub prover: Arc<dyn ProofBackend>,
    pub network: Arc<dyn NetworkClient>,
}

/// Process-wide state shared by every job the worker runs.
///
/// Cloning is cheap; all clones share one verification key cache.
#[derive(Clone)]
pub struct AgentContext {
    config: Arc<AgentConfig>,
    registry: Arc<VerificationKeyRegistry>,
    cache: Arc<VerificationKeyCache>,
    collaborators: Collaborators,
}

impl AgentContext {
    /// Create a new AgentContext with an empty cache.
    pub fn new(
        config: AgentConfig,
        registry: VerificationKeyRegistry,
        collaborators: Collaborators,
    ) -> Self {
        Self::with_cache(
            config,
            registry,
            Arc::new(VerificationKeyCache::new()),
            collaborators,
        )
    }

    pub fn with_cache(
        config: AgentConfig,
        registry: VerificationKeyRegistry,
        cache: Arc<VerificationKeyCache>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            cache,
            collaborators,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<VerificationKeyCache> {
        &self.cache
    }

    pub fn builder(&self) -> &dyn TransactionBuilder {
        self.collaborators.builder.as_ref()
    }

    /// Compiler bound to the registry of the job's network.
    pub fn compiler(&self, job: &JobContext) -> Compiler<'_> {
        Compiler::new(
            self.registry.for_network(job.chain),
            &self.cache,
            self.collaborators.circuits.as_ref(),
            self.collaborators.host.as_ref(),
        )
    }

    pub fn prover(&self) -> Prover<'_> {
        Prover::new(self.collaborators.prover.as_ref())
    }

    pub fn submitter(&self, job: &JobContext) -> Submitter<'_> {
        Submitter::new(
            self.collaborators.network.as_ref(),
            self.collaborators.host.as_ref(),
            &self.config.retry,
            job.chain,
            job.is_local_network,
        )
    }
}
