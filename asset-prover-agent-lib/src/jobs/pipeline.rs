//! Compile, prove and submit steps shared by every transaction handler.

use crate::builder::BuiltTransaction;
use crate::context::AgentContext;
use crate::error::{Error, Result};
use crate::host::JobContext;
use crate::result::JobResult;
use crate::types::{TransactionMetadata, TransactionParams, TransactionRequest};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

/// Recovers the signed transaction parameters and checks that the request's
/// sender is the account that signed it.
pub async fn recover_params(
    ctx: &AgentContext,
    request: &TransactionRequest,
) -> Result<TransactionParams> {
    let params = ctx.builder().transaction_params(request).await?;
    if params.sender != request.sender {
        return Err(Error::Validation(format!(
            "Invalid sender: request names {} but payload is signed by {}",
            request.sender, params.sender
        )));
    }
    Ok(params)
}

pub fn build_error(e: Error) -> Error {
    match e {
        Error::Validation(_) | Error::TransactionBuild(_) => e,
        other => Error::TransactionBuild(other.to_string()),
    }
}

/// Builds submission metadata from a JSON object, dropping null fields.
pub fn metadata(value: Value) -> TransactionMetadata {
    match value {
        Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => TransactionMetadata::new(),
    }
}

/// Compiles the circuits `built` depends on, proves it and, unless the client
/// opted out, submits it. Returns the encoded [`JobResult`].
///
/// Compilation and proving errors abort the batch. Submission errors are
/// folded into an unsuccessful result that still carries the proof.
pub async fn prove_and_submit(
    ctx: &AgentContext,
    job: &JobContext,
    request: &TransactionRequest,
    built: BuiltTransaction,
    compile_admin: bool,
    memo: &str,
    metadata: TransactionMetadata,
) -> Result<String> {
    let started = Instant::now();
    ctx.compiler(job)
        .ensure(&built.required_hashes, compile_admin, built.admin_variant)
        .await?;

    let proved = ctx.prover().prove(request.tx_type.as_str(), built.tx).await?;
    info!(tx_type = %request.tx_type, elapsed = ?started.elapsed(), "Prepared tx");

    let result = if !request.send_transaction {
        JobResult::proved(proved.to_json())
    } else {
        match ctx.submitter(job).submit(&proved, memo, metadata).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Error sending transaction");
                JobResult::unsent(proved.to_json(), e.to_string())
            }
        }
    };
    result.encode()
}
