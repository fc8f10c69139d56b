//! Resolves the provider instance to use for a given credential

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use super::LlmProvider;
use crate::domain::{Credential, DomainError};

/// Trait for turning a chain's credential into a provider instance.
///
/// Chains own their credential, so the executor cannot hold a single
/// pre-authenticated provider; it asks the resolver once per run.
#[async_trait]
pub trait ProviderResolver: Send + Sync + Debug {
    async fn resolve(&self, credential: &Credential) -> Result<Arc<dyn LlmProvider>, DomainError>;
}

/// A resolver that always returns the same provider, ignoring the credential.
#[derive(Debug)]
pub struct StaticProviderResolver {
    provider: Arc<dyn LlmProvider>,
}

impl StaticProviderResolver {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderResolver for StaticProviderResolver {
    async fn resolve(&self, _credential: &Credential) -> Result<Arc<dyn LlmProvider>, DomainError> {
        Ok(self.provider.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ScriptedLlmProvider;

    #[tokio::test]
    async fn test_static_resolver_returns_same_provider_for_any_credential() {
        let provider = Arc::new(ScriptedLlmProvider::new());
        let resolver = StaticProviderResolver::new(provider);

        let first = resolver.resolve(&Credential::new("sk-a")).await.unwrap();
        let second = resolver.resolve(&Credential::new("sk-b")).await.unwrap();

        assert_eq!(first.provider_name(), "scripted");
        assert_eq!(first.provider_name(), second.provider_name());
    }
}
