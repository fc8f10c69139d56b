//! Application state for shared services

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::domain::chain::{ChainDefinition, StepPreview};
use crate::domain::{DomainError, ProviderResolver};
use crate::infrastructure::services::{
    ChainLocation, ChainRun, ChainService, CreatedChain, NewChain,
};

const DEFAULT_HOST: &str = "localhost:3001";

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub chain_service: Arc<dyn ChainServiceTrait>,
    /// Overrides the scheme and host of generated URLs
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(chain_service: Arc<dyn ChainServiceTrait>) -> Self {
        Self {
            chain_service,
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, base_url: Option<String>) -> Self {
        self.public_base_url = base_url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Scheme and host that generated URLs are rooted at
    ///
    /// Uses the configured public URL when set, else the request's `Host`
    /// header: `http` for localhost, `https` otherwise.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base_url) = &self.public_base_url {
            return base_url.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST);
        let scheme = if host.contains("localhost") {
            "http"
        } else {
            "https"
        };

        format!("{}://{}", scheme, host)
    }
}

/// Trait for chain service operations
#[async_trait::async_trait]
pub trait ChainServiceTrait: Send + Sync {
    async fn create(&self, request: NewChain, base_url: &str)
        -> Result<CreatedChain, DomainError>;
    async fn get(&self, id: &str) -> Result<ChainDefinition, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<ChainDefinition, DomainError>;
    async fn run(&self, id: &str, input: Option<&str>) -> Result<ChainRun, DomainError>;
    async fn run_by_slug(&self, slug: &str, input: Option<&str>)
        -> Result<ChainRun, DomainError>;
    async fn preview(&self, preview: StepPreview) -> Result<String, DomainError>;
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError>;
    async fn locate(&self, id: &str) -> Result<ChainLocation, DomainError>;
    async fn health_check(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl<R: ProviderResolver + 'static> ChainServiceTrait for ChainService<R> {
    async fn create(
        &self,
        request: NewChain,
        base_url: &str,
    ) -> Result<CreatedChain, DomainError> {
        ChainService::create(self, request, base_url).await
    }

    async fn get(&self, id: &str) -> Result<ChainDefinition, DomainError> {
        ChainService::get(self, id).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<ChainDefinition, DomainError> {
        ChainService::find_by_slug(self, slug).await
    }

    async fn run(&self, id: &str, input: Option<&str>) -> Result<ChainRun, DomainError> {
        ChainService::run(self, id, input).await
    }

    async fn run_by_slug(
        &self,
        slug: &str,
        input: Option<&str>,
    ) -> Result<ChainRun, DomainError> {
        ChainService::run_by_slug(self, slug, input).await
    }

    async fn preview(&self, preview: StepPreview) -> Result<String, DomainError> {
        ChainService::preview(self, preview).await
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        ChainService::list_for_owner(self, owner_id).await
    }

    async fn locate(&self, id: &str) -> Result<ChainLocation, DomainError> {
        ChainService::locate(self, id).await
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        ChainService::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{ChainExecutor, ChainExecutorConfig};
    use crate::domain::llm::{ScriptedLlmProvider, StaticProviderResolver};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::services::ChainRepository;
    use crate::infrastructure::storage::InMemoryChainStore;

    fn state() -> AppState {
        let service = ChainService::new(
            ChainRepository::new(
                Arc::new(InMemoryCache::new()),
                Arc::new(InMemoryChainStore::new()),
            ),
            ChainExecutor::new(
                StaticProviderResolver::new(Arc::new(ScriptedLlmProvider::new())),
                ChainExecutorConfig::default(),
            ),
        );

        AppState::new(Arc::new(service))
    }

    fn headers(host: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(host) = host {
            headers.insert(header::HOST, host.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_base_url_from_host() {
        let state = state();
        assert_eq!(
            state.base_url(&headers(Some("localhost:3001"))),
            "http://localhost:3001"
        );
        assert_eq!(
            state.base_url(&headers(Some("chains.example.com"))),
            "https://chains.example.com"
        );
        assert_eq!(state.base_url(&headers(None)), "http://localhost:3001");
    }

    #[test]
    fn test_public_base_url_overrides_host() {
        let state = state().with_public_base_url(Some("https://public.example.com/".to_string()));
        assert_eq!(
            state.base_url(&headers(Some("10.0.0.5:8080"))),
            "https://public.example.com"
        );
    }

    #[test]
    fn test_blank_public_base_url_is_ignored() {
        let state = state().with_public_base_url(Some("  ".to_string()));
        assert!(state.public_base_url.is_none());
    }
}
