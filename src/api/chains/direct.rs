//! Slug-addressed chain endpoints

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::debug;

use super::process::run_response;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ProcessRequest, SlugLookupResponse};

/// GET /api/chain-direct/{slug}
pub async fn locate_chain(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<SlugLookupResponse>, ApiError> {
    let chain = state.chain_service.find_by_slug(&slug).await?;
    let base_url = state.base_url(&headers);

    Ok(Json(SlugLookupResponse::new(&chain, &base_url)))
}

/// POST /api/chain-direct/{slug}
pub async fn process_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> Result<Response, ApiError> {
    debug!(slug = %slug, "Processing chain by slug");

    let run = state.chain_service.run_by_slug(&slug, request.input.as_deref()).await?;
    run_response(run, true)
}
