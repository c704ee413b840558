//! asset-prover-agent-lib
//! Core library of the agent that compiles, proves and submits token and NFT
//! transactions on behalf of a job-worker host.

// Modules
pub mod builder;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod jobs;
pub mod network;
pub mod prover;
pub mod registry;
pub mod remote;
pub mod result;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use context::{AgentContext, Collaborators};
pub use error::{Error, Result};
pub use jobs::{PROVE_TASK, ProvingAgent};
pub use result::JobResult;
pub use state::VerificationKeyCache;
pub use types::{CircuitId, CircuitKind, NetworkId, TransactionRequest, TransactionType};
