use thiserror::Error;

/// Comprehensive error type for the proving agent.
#[derive(Debug, Error)]
pub enum Error {
    // --- Batch and request validation ---
    #[error("Batch contains no transactions")]
    EmptyBatch,

    #[error("Invalid task: expected \"prove\", got \"{0}\"")]
    InvalidTask(String),

    #[error("WALLET is not configured")]
    MissingWalletConfiguration,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),

    // --- Compilation ---
    #[error("Verification key not found for hash {0}")]
    KeyNotFound(String),

    #[error("Verification key for {circuit} ({expected}) does not match compiled hash {actual}")]
    VerificationKeyMismatch {
        circuit: String,
        expected: String,
        actual: String,
    },

    #[error("Upgrade key {circuit} ({hash}) not supported")]
    UnsupportedKey { circuit: String, hash: String },

    #[error("Circuit compilation failed: {0}")]
    CircuitCompilation(String),

    // --- Proving and submission ---
    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("Networking error: {0}")]
    Network(String),

    #[error("Method not implemented: {0}")]
    NotImplemented(&'static str),

    // --- Ambient ---
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration parsing error (TOML): {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error (JSON): {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Could not acquire lock: {0}")]
    LockError(String),
}

impl Error {
    /// Whether this error leaves the compiled-circuit state of the process
    /// untrustworthy, so the worker has to be restarted.
    ///
    /// Registry lookup failures and unsupported keys describe the request, not
    /// the process, and are surfaced without a restart.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            Error::VerificationKeyMismatch { .. }
                | Error::CircuitCompilation(_)
                | Error::LockError(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::LockError(format!("Mutex/RwLock poisoned: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
