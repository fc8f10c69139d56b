//! Chain endpoints: compile, run, locate, preview and diagnostics

pub mod compile;
pub mod diagnostics;
pub mod direct;
pub mod owners;
pub mod preview;
pub mod process;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create the chain router, mounted under `/api`
pub fn create_chain_router() -> Router<AppState> {
    Router::new()
        .route("/chains", post(compile::create_chain))
        .route(
            "/chains/{user}/{port}/{id}",
            get(process::describe_chain).post(process::process_chain_endpoint),
        )
        .route("/process/{id}", post(process::process_chain))
        .route(
            "/chain-direct/{slug}",
            get(direct::locate_chain).post(direct::process_by_slug),
        )
        .route("/chain-process", post(preview::preview_step))
        .route("/users/{owner_id}/chains", get(owners::list_owner_chains))
        .route("/debug-chain/{id}", get(diagnostics::debug_chain))
}
