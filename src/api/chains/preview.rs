//! Design-time single step preview

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, PreviewRequest, PreviewResponse};
use crate::domain::chain::StepPreview;
use crate::domain::Credential;

/// POST /api/chain-process
pub async fn preview_step(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    debug!(
        model = ?request.model,
        has_api_key = request.api_key.is_some(),
        input_len = request.input_statement.len(),
        "Previewing step"
    );

    let preview = StepPreview {
        input_statement: request.input_statement,
        instructions: request.instructions,
        required_output: request.required_output,
        credential: Credential::non_empty(request.api_key),
        model: request.model,
    };

    let result = state.chain_service.preview(preview).await?;

    Ok(Json(PreviewResponse { result }))
}
