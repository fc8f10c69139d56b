//! Chain compilation endpoint

use axum::{extract::State, http::HeaderMap};
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::api::types::{ApiError, CreateChainRequest, CreateChainResponse, Json};
use crate::infrastructure::services::PersistenceStatus;

/// POST /api/chains
pub async fn create_chain(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateChainRequest>,
) -> Result<Json<CreateChainResponse>, ApiError> {
    let new_chain = request
        .into_new_chain()
        .ok_or_else(|| ApiError::unauthorized("User information required"))?;
    let base_url = state.base_url(&headers);

    let created = state.chain_service.create(new_chain, &base_url).await?;

    if let PersistenceStatus::MemoryOnly { reason } = &created.persistence {
        warn!(chain_id = %created.chain.id(), reason = %reason, "Chain compiled without durable copy");
    }

    info!(
        chain_id = %created.chain.id(),
        owner_id = %created.chain.owner_id(),
        steps = created.chain.step_count(),
        "Chain compiled"
    );

    Ok(Json(CreateChainResponse::new(&created, &base_url)))
}
