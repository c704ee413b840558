use crate::context::AgentContext;
use crate::error::{Error, Result};
use crate::host::JobContext;
use crate::jobs::pipeline::{build_error, metadata, prove_and_submit, recover_params};
use crate::types::TransactionRequest;
use serde_json::json;
use tracing::info;

/// Deploys a new collection or token. Always compiles the admin circuits,
/// since a launch is signed by the admin.
pub async fn launch(
    ctx: &AgentContext,
    job: &JobContext,
    request: &TransactionRequest,
) -> Result<String> {
    if !request.tx_type.is_launch() {
        return Err(Error::Validation(format!(
            "{} is not a launch transaction",
            request.tx_type
        )));
    }
    let fee = ctx.config().proving_fee(request.tx_type)?;

    let params = recover_params(ctx, request).await?;
    info!(admin = %params.sender, asset = %request.asset_address(), "Launching");

    let built = ctx
        .builder()
        .build_launch(job.chain, request, &fee)
        .await
        .map_err(build_error)?;

    let metadata = metadata(json!({
        "txType": request.tx_type.as_str(),
        "sender": params.sender,
        "assetAddress": request.asset_address(),
        "adminContractAddress": request.params.admin_contract_address,
        "adminType": built.admin_variant.to_string(),
        "symbol": request.symbol,
        "name": request.params.collection_name,
        "creator": request.params.creator,
        "uri": request.params.uri,
    }));

    prove_and_submit(ctx, job, request, built, true, &params.memo, metadata).await
}
