//! Chain diagnostics

use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ChainDebugResponse, Json};

/// GET /api/debug-chain/{id}
///
/// Reports which tiers hold the chain. Never returns the chain itself.
pub async fn debug_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChainDebugResponse>, ApiError> {
    let location = state.chain_service.locate(&id).await?;

    Ok(Json(ChainDebugResponse {
        success: location.in_cache || location.in_store,
        location,
    }))
}
