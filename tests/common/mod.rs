//! Shared helpers for router-level tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use chainport::api::{create_router_with_state, AppState};
use chainport::domain::chain::{ChainExecutor, ChainExecutorConfig};
use chainport::domain::{ChainDefinition, ChainId, ChainStore, DomainError};
use chainport::infrastructure::cache::InMemoryCache;
use chainport::infrastructure::llm::{HttpClient, OpenAiProviderResolver};
use chainport::infrastructure::services::{ChainRepository, ChainService};
use chainport::infrastructure::storage::InMemoryChainStore;

pub const DEFAULT_BASE: &str = "http://localhost:3001";

pub struct TestApp {
    pub router: Router,
    pub server: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(Arc::new(InMemoryChainStore::new()), ChainExecutorConfig::default()).await
    }

    pub async fn with_store(store: Arc<dyn ChainStore>) -> Self {
        Self::with(store, ChainExecutorConfig::default()).await
    }

    pub async fn with_config(config: ChainExecutorConfig) -> Self {
        Self::with(Arc::new(InMemoryChainStore::new()), config).await
    }

    pub async fn with(store: Arc<dyn ChainStore>, config: ChainExecutorConfig) -> Self {
        let server = MockServer::start().await;
        let resolver = OpenAiProviderResolver::new(HttpClient::new(), server.uri());
        let service = ChainService::new(
            ChainRepository::new(Arc::new(InMemoryCache::new()), store),
            ChainExecutor::new(resolver, config),
        );
        let router = create_router_with_state(AppState::new(Arc::new(service)));

        Self { router, server }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(post_json(uri, body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Compile the two-step arithmetic chain and return the create body
    pub async fn create_arithmetic_chain(&self) -> Value {
        let (status, body) = self.post("/api/chains", arithmetic_chain()).await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body
    }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Path part of a URL generated under the default base
pub fn local_path(url: &str) -> &str {
    url.strip_prefix(DEFAULT_BASE).unwrap_or(url)
}

pub fn arithmetic_chain() -> Value {
    json!({
        "steps": [
            {"id": 1, "instructions": "double the number", "requiredOutput": "a number"},
            {"id": 2, "instructions": "add one", "requiredOutput": "a number"}
        ],
        "credential": "sk-chain-key",
        "owner": {"id": "owner-1", "email": "jane@example.com", "displayName": "Jane"}
    })
}

/// Chat-completions success body
pub fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 2}
    })
}

pub fn provider_error(message: &str) -> Value {
    json!({"error": {"message": message, "type": "invalid_request_error"}})
}

/// Store whose every operation fails, as during a database outage
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn outage() -> DomainError {
    DomainError::storage("connection refused")
}

#[async_trait]
impl ChainStore for UnavailableStore {
    async fn put(&self, _chain: &ChainDefinition) -> Result<(), DomainError> {
        Err(outage())
    }

    async fn get(
        &self,
        _owner_id: &str,
        _id: &ChainId,
    ) -> Result<Option<ChainDefinition>, DomainError> {
        Err(outage())
    }

    async fn list_owners(&self) -> Result<Vec<String>, DomainError> {
        Err(outage())
    }

    async fn list_for_owner(&self, _owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        Err(outage())
    }
}
