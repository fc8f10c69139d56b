//! Per-owner chain listing

use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ChainView, Json, OwnerChainsResponse};

/// GET /api/users/{owner_id}/chains
pub async fn list_owner_chains(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<OwnerChainsResponse>, ApiError> {
    let chains = state.chain_service.list_for_owner(&owner_id).await?;
    let chains: Vec<ChainView> = chains.iter().map(ChainView::from).collect();

    Ok(Json(OwnerChainsResponse {
        success: true,
        owner_id,
        count: chains.len(),
        chains,
    }))
}
