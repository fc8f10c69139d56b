//! Chain run and describe endpoints

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::{ApiError, DescribeChainResponse, Json, ProcessRequest, ProcessResponse};
use crate::domain::chain::RunStatus;
use crate::domain::DomainError;
use crate::infrastructure::services::ChainRun;

/// POST /api/process/{id}
pub async fn process_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> Result<Response, ApiError> {
    debug!(chain_id = %id, "Processing chain");

    let run = state.chain_service.run(&id, request.input.as_deref()).await?;
    run_response(run, false)
}

/// POST /api/chains/{user}/{port}/{id}
///
/// The user and port segments are decorative; the identifier alone
/// selects the chain.
pub async fn process_chain_endpoint(
    State(state): State<AppState>,
    Path((_user, _port, id)): Path<(String, String, String)>,
    Json(request): Json<ProcessRequest>,
) -> Result<Response, ApiError> {
    debug!(chain_id = %id, "Processing chain endpoint");

    let run = state.chain_service.run(&id, request.input.as_deref()).await?;
    run_response(run, false)
}

/// GET /api/chains/{user}/{port}/{id}
pub async fn describe_chain(
    State(state): State<AppState>,
    Path((_user, _port, id)): Path<(String, String, String)>,
) -> Result<Json<DescribeChainResponse>, ApiError> {
    let chain = state.chain_service.get(&id).await.map_err(|e| match e {
        DomainError::NotFound { .. } => {
            ApiError::not_found("Chain not found. It may have expired or been deleted.")
        }
        other => ApiError::from(other),
    })?;

    Ok(Json(DescribeChainResponse::new(&chain)))
}

/// Turn a finished run into the success body or the partial-failure error
pub(super) fn run_response(run: ChainRun, include_chain_id: bool) -> Result<Response, ApiError> {
    let ChainRun { chain_id, result } = run;

    if let RunStatus::Failed {
        step_index,
        step_id,
    } = result.status
    {
        warn!(
            chain_id = %chain_id,
            step_index,
            step_id,
            completed = result.step_results.len(),
            error = ?result.error,
            "Chain run failed"
        );
        return Err(ApiError::step_failed(
            result.error.as_ref(),
            result.step_results,
        ));
    }

    let step_results = result.outputs();
    let response = ProcessResponse {
        success: true,
        chain_id: include_chain_id.then(|| chain_id.to_string()),
        final_result: result.final_result.unwrap_or_default(),
        steps: result.step_results,
        step_results,
    };

    Ok(Json(response).into_response())
}
