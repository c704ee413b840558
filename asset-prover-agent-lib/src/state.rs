use crate::error::Result;
use crate::types::{CircuitId, CompiledKey};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

type Slot = Arc<AsyncMutex<Option<Arc<CompiledKey>>>>;

/// Process-wide memoization of compiled circuits.
///
/// Each circuit has its own async lock guarding check-then-compile-then-insert,
/// so concurrent requests for the same uncompiled circuit collapse into one
/// compilation while different circuits compile in parallel. Entries live for
/// the lifetime of the process; there is no eviction.
#[derive(Debug, Default)]
pub struct VerificationKeyCache {
    slots: Mutex<HashMap<CircuitId, Slot>>,
    compilations: AtomicUsize,
}

impl VerificationKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled key for `circuit`, running `compile` only if no
    /// entry exists yet.
    ///
    /// A failed compilation leaves the slot empty and the error is returned to
    /// the caller that ran it; waiters queued behind it will try again.
    pub async fn get_or_compile<F, Fut>(
        &self,
        circuit: &CircuitId,
        compile: F,
    ) -> Result<Arc<CompiledKey>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompiledKey>>,
    {
        let slot = self.slot(circuit)?;
        let mut entry = slot.lock().await;
        if let Some(compiled) = entry.as_ref() {
            debug!(%circuit, "Using cached verification key");
            return Ok(compiled.clone());
        }

        info!(%circuit, "Compiling circuit");
        let compiled = Arc::new(compile().await?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        *entry = Some(compiled.clone());
        Ok(compiled)
    }

    /// Returns the cached key without compiling. Does not wait for an
    /// in-flight compilation.
    pub fn get(&self, circuit: &CircuitId) -> Result<Option<Arc<CompiledKey>>> {
        let slot = match self.slots.lock()?.get(circuit) {
            Some(slot) => slot.clone(),
            None => return Ok(None),
        };
        Ok(slot.try_lock().ok().and_then(|entry| entry.clone()))
    }

    pub fn contains(&self, circuit: &CircuitId) -> Result<bool> {
        Ok(self.get(circuit)?.is_some())
    }

    /// Number of circuits with a slot, compiled or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.slots.lock()?.len())
    }

    /// Number of compilations that completed successfully in this process.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    fn slot(&self, circuit: &CircuitId) -> Result<Slot> {
        let mut slots = self.slots.lock()?;
        Ok(slots.entry(circuit.clone()).or_default().clone())
    }
}
