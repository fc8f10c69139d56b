//! Chainport
//!
//! Compiles ordered lists of natural-language instructions into callable
//! HTTP endpoints. Each call replays the steps against a chat-completion
//! service, feeding every step's output into the next.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::chain::ChainExecutor;
use infrastructure::{
    cache::{InMemoryCache, InMemoryCacheConfig},
    llm::{HttpClient, OpenAiProviderResolver},
    services::{ChainRepository, ChainService},
    storage::ChainStoreFactory,
};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_config = config.storage.storage_config()?;
    info!(backend = ?storage_config.storage_type(), "Initializing chain store");
    let store = ChainStoreFactory::create(&storage_config).await?;

    let cache = Arc::new(InMemoryCache::with_config(
        InMemoryCacheConfig::default().with_max_capacity(config.cache.max_capacity),
    ));

    let executor_config = config.completion.executor_config();
    info!(
        model = %executor_config.model,
        prompt_style = ?executor_config.prompt_style,
        step_timeout = ?executor_config.step_timeout,
        fallback_credential = executor_config.fallback_credential.is_some(),
        "Configuring chain executor"
    );

    let resolver = OpenAiProviderResolver::new(HttpClient::new(), config.completion.base_url.clone());
    let service = ChainService::new(
        ChainRepository::new(cache, store),
        ChainExecutor::new(resolver, executor_config),
    );

    Ok(AppState::new(Arc::new(service)).with_public_base_url(config.public.base_url.clone()))
}
