use crate::error::{Error, Result};
use crate::host::WorkerHost;
use crate::registry::resolve;
use crate::state::VerificationKeyCache;
use crate::types::{AdminVariant, CircuitId, CircuitKind, CompiledKey, VerificationKeyEntry};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The circuit implementations. Compiling is expensive (seconds to minutes)
/// and CPU bound.
#[async_trait]
pub trait CircuitCompiler: Send + Sync {
    async fn compile(&self, circuit: &CircuitId) -> Result<CompiledKey>;
}

/// Ensures the circuits a transaction depends on are compiled and match the
/// network's registry.
pub struct Compiler<'a> {
    registry: &'a [VerificationKeyEntry],
    cache: &'a VerificationKeyCache,
    circuits: &'a dyn CircuitCompiler,
    host: &'a dyn WorkerHost,
}

impl<'a> Compiler<'a> {
    pub fn new(
        registry: &'a [VerificationKeyEntry],
        cache: &'a VerificationKeyCache,
        circuits: &'a dyn CircuitCompiler,
        host: &'a dyn WorkerHost,
    ) -> Self {
        Self {
            registry,
            cache,
            circuits,
            host,
        }
    }

    /// Compiles every circuit behind `required_hashes` and checks each
    /// compiled hash against the registry.
    ///
    /// A mismatch or a compiler failure means this process can no longer be
    /// trusted to produce proofs: the host is asked to restart the worker and
    /// the error is returned. Lookup failures are returned without a restart.
    pub async fn ensure(
        &self,
        required_hashes: &[String],
        compile_admin: bool,
        admin_variant: AdminVariant,
    ) -> Result<()> {
        info!(?required_hashes, compile_admin, %admin_variant, "Compile");
        let started = Instant::now();

        let result = self
            .ensure_all(required_hashes, compile_admin, admin_variant)
            .await;
        match result {
            Ok(()) => {
                info!(elapsed = ?started.elapsed(), "Compiled");
                Ok(())
            }
            Err(e) if e.requires_restart() => {
                error!(error = %e, "Error in compile, restarting worker");
                if let Err(restart_err) = self.host.force_worker_restart().await {
                    error!(error = %restart_err, "Failed to restart worker");
                }
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Compile rejected");
                Err(e)
            }
        }
    }

    async fn ensure_all(
        &self,
        required_hashes: &[String],
        compile_admin: bool,
        admin_variant: AdminVariant,
    ) -> Result<()> {
        for hash in required_hashes {
            let entry = resolve(hash, self.registry)?;
            let circuit = match entry.kind {
                CircuitKind::PrimaryAsset | CircuitKind::AdvancedPrimaryAsset => {
                    // The advanced asset circuit is only needed when signing as admin.
                    if compile_admin && admin_variant == AdminVariant::Advanced {
                        CircuitId::asset(CircuitKind::AdvancedPrimaryAsset)
                    } else {
                        CircuitId::asset(CircuitKind::PrimaryAsset)
                    }
                }
                CircuitKind::AdminStandard | CircuitKind::AdminAdvanced => {
                    if !compile_admin {
                        debug!(key = %entry.circuit_key, "Skipping admin circuit");
                        continue;
                    }
                    CircuitId::contract(entry.kind, &entry.circuit_key)
                }
                CircuitKind::UserContract => CircuitId::contract(entry.kind, &entry.circuit_key),
                CircuitKind::UpgradeContract => {
                    return Err(Error::UnsupportedKey {
                        circuit: entry.circuit_key.clone(),
                        hash: hash.clone(),
                    });
                }
            };

            debug!(kind = ?entry.kind, key = %entry.circuit_key, %circuit, "Compiling");
            let compiled = self
                .cache
                .get_or_compile(&circuit, || self.compile(&circuit))
                .await?;

            if compiled.hash != entry.expected_hash {
                return Err(Error::VerificationKeyMismatch {
                    circuit: format!("{} {}", entry.circuit_key, circuit),
                    expected: entry.expected_hash.clone(),
                    actual: compiled.hash.clone(),
                });
            }
        }
        Ok(())
    }

    async fn compile(&self, circuit: &CircuitId) -> Result<CompiledKey> {
        let started = Instant::now();
        let compiled = self.circuits.compile(circuit).await.map_err(|e| match e {
            Error::CircuitCompilation(_) => e,
            other => Error::CircuitCompilation(format!("{}: {}", circuit, other)),
        })?;
        info!(%circuit, elapsed = ?started.elapsed(), "Compiled circuit");
        Ok(compiled)
    }
}
