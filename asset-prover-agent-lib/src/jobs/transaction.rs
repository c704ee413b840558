use crate::context::AgentContext;
use crate::error::{Error, Result};
use crate::host::JobContext;
use crate::jobs::pipeline::{build_error, metadata, prove_and_submit, recover_params};
use crate::types::TransactionRequest;
use serde_json::json;
use tracing::info;

/// Proves any operation on an existing collection or token.
pub async fn transaction(
    ctx: &AgentContext,
    job: &JobContext,
    request: &TransactionRequest,
) -> Result<String> {
    if request.tx_type.is_launch() {
        return Err(Error::Validation(
            "Launch transaction is not supported".to_string(),
        ));
    }
    let fee = ctx.config().proving_fee(request.tx_type)?;

    let params = recover_params(ctx, request).await?;
    info!(
        tx_type = %request.tx_type,
        sender = %params.sender,
        asset = %request.asset_address(),
        nonce = params.nonce,
        "transaction"
    );

    let built = ctx
        .builder()
        .build_mutation(job.chain, request, &fee)
        .await
        .map_err(build_error)?;

    let compile_admin = request.tx_type.compiles_admin();
    let metadata = metadata(json!({
        "txType": request.tx_type.as_str(),
        "sender": params.sender,
        "assetAddress": request.asset_address(),
        "adminType": built.admin_variant.to_string(),
        "adminContractAddress": built.admin_contract_address,
        "symbol": built.symbol.as_ref().or(request.symbol.as_ref()),
        "name": built.name,
    }));

    prove_and_submit(ctx, job, request, built, compile_admin, &params.memo, metadata).await
}
