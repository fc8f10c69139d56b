//! Builds an OpenAI provider for each chain's own credential

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::http_client::HttpClient;
use super::openai::OpenAiProvider;
use crate::domain::{Credential, DomainError, LlmProvider, ProviderResolver};

/// Resolver that authenticates every call with the caller's credential
///
/// The underlying reqwest client (and its connection pool) is shared across
/// all providers it hands out.
#[derive(Debug, Clone)]
pub struct OpenAiProviderResolver {
    client: HttpClient,
    base_url: String,
}

impl OpenAiProviderResolver {
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderResolver for OpenAiProviderResolver {
    async fn resolve(&self, credential: &Credential) -> Result<Arc<dyn LlmProvider>, DomainError> {
        if credential.is_empty() {
            return Err(DomainError::configuration("OpenAI API key not set."));
        }

        debug!(credential = %credential.masked(), "Resolving OpenAI provider");
        Ok(Arc::new(OpenAiProvider::with_base_url(
            self.client.clone(),
            credential.api_key(),
            self.base_url.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_empty_credential() {
        let resolver = OpenAiProviderResolver::new(HttpClient::new(), "http://localhost:1");
        let result = resolver.resolve(&Credential::new("")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolves_openai_provider() {
        let resolver = OpenAiProviderResolver::new(HttpClient::new(), "http://localhost:1");
        let provider = resolver.resolve(&Credential::new("sk-test")).await.unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }
}
