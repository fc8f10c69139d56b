//! Chain repository - two-tier lookup over the process cache and the durable store

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::cache::{Cache, CacheExt};
use crate::domain::chain::{
    ChainDefinition, ChainEndpoint, ChainId, ChainOwner, ChainStep, ChainStore,
};
use crate::domain::{Credential, DomainError};

/// Minimum fragment length accepted by [`ChainRepository::resolve_by_prefix`]
pub const MIN_SLUG_LEN: usize = 4;

/// Input for compiling a new chain
#[derive(Debug, Clone)]
pub struct NewChain {
    pub steps: Vec<ChainStep>,
    pub owner: ChainOwner,
    pub credential: Credential,
}

/// Where a freshly created chain ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Durable,
    /// Durable write failed; the chain lives in the cache only
    MemoryOnly { reason: String },
}

impl PersistenceStatus {
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable)
    }
}

/// Result of [`ChainRepository::create`]
#[derive(Debug, Clone)]
pub struct CreatedChain {
    pub chain: ChainDefinition,
    pub persistence: PersistenceStatus,
}

/// Diagnostic view of where a chain is held
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLocation {
    pub chain_id: String,
    pub in_cache: bool,
    pub in_store: bool,
    pub owner_id: Option<String>,
    pub has_credential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

/// Repository mapping chain identifiers to definitions
///
/// The cache is consulted first; the durable store is the source of truth.
/// Store outages degrade to cache-only behaviour instead of failing.
#[derive(Debug, Clone)]
pub struct ChainRepository {
    cache: Arc<dyn Cache>,
    store: Arc<dyn ChainStore>,
}

impl ChainRepository {
    pub fn new(cache: Arc<dyn Cache>, store: Arc<dyn ChainStore>) -> Self {
        Self { cache, store }
    }

    pub fn store(&self) -> &Arc<dyn ChainStore> {
        &self.store
    }

    /// Cache read that treats cache faults as misses
    async fn cached(&self, id: &str) -> Option<ChainDefinition> {
        match self.cache.get::<ChainDefinition>(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(chain_id = %id, error = %e, "Chain cache read failed, treating as miss");
                None
            }
        }
    }

    async fn remember(&self, chain: &ChainDefinition) {
        if let Err(e) = self.cache.set(chain.id().as_str(), chain).await {
            warn!(chain_id = %chain.id(), error = %e, "Failed to cache chain");
        }
    }

    /// Resolve a chain by exact identifier
    #[instrument(skip(self), fields(chain_id = %id))]
    pub async fn resolve(&self, id: &ChainId) -> Result<ChainDefinition, DomainError> {
        if let Some(chain) = self.cached(id.as_str()).await {
            debug!("Chain served from cache");
            return Ok(chain);
        }

        match self.store.find(id).await {
            Ok(Some(chain)) => {
                debug!(owner_id = %chain.owner_id(), "Chain loaded from durable store");
                self.remember(&chain).await;
                Ok(chain)
            }
            Ok(None) => Err(chain_not_found()),
            Err(e) => {
                warn!(error = %e, "Durable store unavailable while resolving chain");
                // Re-check: a concurrent create may have cached it meanwhile
                self.cached(id.as_str()).await.ok_or_else(chain_not_found)
            }
        }
    }

    /// Compile and persist a new chain
    #[instrument(skip(self, request), fields(owner_id = %request.owner.id, steps = request.steps.len()))]
    pub async fn create(
        &self,
        request: NewChain,
        base_url: &str,
    ) -> Result<CreatedChain, DomainError> {
        ChainDefinition::validate_steps(&request.steps)?;

        if request.credential.is_empty() {
            return Err(DomainError::validation(
                "Invalid chain data. An API key is required.",
            ));
        }

        if request.owner.email.trim().is_empty() {
            return Err(DomainError::validation(
                "Invalid chain data. Owner email is required.",
            ));
        }

        let id = ChainId::generate();
        let endpoint = ChainEndpoint::build(base_url, &request.owner, &id);
        let chain = ChainDefinition::new(
            id,
            request.steps,
            request.credential,
            &request.owner,
            endpoint,
        );

        let persistence = match self.store.put(&chain).await {
            Ok(()) => {
                info!(chain_id = %chain.id(), "Chain stored durably");
                PersistenceStatus::Durable
            }
            Err(e) => {
                error!(
                    chain_id = %chain.id(),
                    error = %e,
                    "Durable write failed, chain kept in memory only"
                );
                PersistenceStatus::MemoryOnly {
                    reason: e.to_string(),
                }
            }
        };

        self.remember(&chain).await;

        Ok(CreatedChain { chain, persistence })
    }

    /// Resolve the first chain whose identifier contains `fragment`
    ///
    /// When several chains match, which one is returned is unspecified.
    #[instrument(skip(self))]
    pub async fn resolve_by_prefix(&self, fragment: &str) -> Result<ChainDefinition, DomainError> {
        let fragment = fragment.trim();

        if fragment.chars().count() < MIN_SLUG_LEN {
            return Err(DomainError::validation(format!(
                "Slug must be at least {} characters long",
                MIN_SLUG_LEN
            )));
        }

        match self.store.find_by_fragment(fragment).await {
            Ok(Some(chain)) => {
                self.remember(&chain).await;
                return Ok(chain);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Durable store unavailable during slug lookup, scanning cache only");
            }
        }

        let keys = self.cache.keys().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to enumerate chain cache");
            Vec::new()
        });

        for key in keys.iter().filter(|k| k.contains(fragment)) {
            if let Some(chain) = self.cached(key).await {
                return Ok(chain);
            }
        }

        Err(DomainError::not_found("No chains found matching this slug"))
    }

    /// All chains of an owner, newest first
    #[instrument(skip(self))]
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        let mut chains = self.store.list_for_owner(owner_id).await?;
        chains.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(chains)
    }

    /// Report where a chain is held without failing on store outages
    #[instrument(skip(self), fields(chain_id = %id))]
    pub async fn locate(&self, id: &ChainId) -> ChainLocation {
        let cached = self.cached(id.as_str()).await;
        let mut location = ChainLocation {
            chain_id: id.to_string(),
            in_cache: cached.is_some(),
            owner_id: cached.as_ref().map(|c| c.owner_id().to_string()),
            has_credential: cached.as_ref().is_some_and(ChainDefinition::has_credential),
            ..Default::default()
        };

        match self.store.find(id).await {
            Ok(Some(stored)) => {
                location.in_store = true;
                location.owner_id = Some(stored.owner_id().to_string());
                location.has_credential |= stored.has_credential();
            }
            Ok(None) => {}
            Err(e) => location.store_error = Some(e.to_string()),
        }

        location
    }
}

fn chain_not_found() -> DomainError {
    DomainError::not_found("Chain not found. Please check the chain ID.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::chain::MockChainStore;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::storage::InMemoryChainStore;
    use regex::Regex;
    use tokio_test::{assert_err, assert_ok};

    fn new_chain(owner: &str) -> NewChain {
        NewChain {
            steps: vec![ChainStep::new(1, "uppercase the input", "uppercased text")],
            owner: ChainOwner::new(owner, format!("{}@example.com", owner)),
            credential: Credential::new("sk-test"),
        }
    }

    fn repository() -> (ChainRepository, Arc<InMemoryCache>, Arc<InMemoryChainStore>) {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryChainStore::new());
        (
            ChainRepository::new(cache.clone(), store.clone()),
            cache,
            store,
        )
    }

    fn failing_store() -> MockChainStore {
        let mut store = MockChainStore::new();
        store
            .expect_put()
            .returning(|_| Err(DomainError::storage("connection refused")));
        store
            .expect_find()
            .returning(|_| Err(DomainError::storage("connection refused")));
        store
            .expect_find_by_fragment()
            .returning(|_| Err(DomainError::storage("connection refused")));
        store
    }

    #[tokio::test]
    async fn test_create_generates_distinct_valid_ids() {
        let (repo, _, _) = repository();
        let pattern = Regex::new(r"^\d+-[0-9a-z]+$").unwrap();

        let first = repo.create(new_chain("alice"), "http://localhost:3000").await.unwrap();
        let second = repo.create(new_chain("alice"), "http://localhost:3000").await.unwrap();

        assert!(pattern.is_match(first.chain.id().as_str()));
        assert_ne!(first.chain.id(), second.chain.id());
        assert!(first.persistence.is_durable());
        assert!(first
            .chain
            .endpoint()
            .endpoint_url
            .starts_with("http://localhost:3000/api/chains/alice/"));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (repo, _, store) = repository();

        let mut empty_steps = new_chain("alice");
        empty_steps.steps.clear();
        assert!(assert_err!(repo.create(empty_steps, "http://x").await).is_validation());

        let mut no_key = new_chain("alice");
        no_key.credential = Credential::new("  ");
        assert!(assert_err!(repo.create(no_key, "http://x").await).is_validation());

        let mut no_email = new_chain("alice");
        no_email.owner.email = String::new();
        assert!(assert_err!(repo.create(no_email, "http://x").await).is_validation());

        assert!(store.list_owners().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_cache_and_store_agree() {
        let (repo, cache, _) = repository();
        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();
        let id = created.chain.id().clone();

        let from_cache = repo.resolve(&id).await.unwrap();

        cache.clear().await.unwrap();
        let from_store = repo.resolve(&id).await.unwrap();

        assert_eq!(from_cache, from_store);
        assert_eq!(from_store, created.chain);
        // Store hit repopulates the cache
        assert!(cache.exists(id.as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_not_found() {
        let (repo, _, _) = repository();
        let error = assert_err!(repo.resolve(&ChainId::new("1-nothere").unwrap()).await);
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_store_outage_on_create_keeps_chain_usable() {
        let repo = ChainRepository::new(Arc::new(InMemoryCache::new()), Arc::new(failing_store()));

        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();
        assert!(matches!(
            created.persistence,
            PersistenceStatus::MemoryOnly { .. }
        ));

        let resolved = assert_ok!(repo.resolve(created.chain.id()).await);
        assert_eq!(resolved, created.chain);
    }

    #[tokio::test]
    async fn test_store_outage_on_resolve_without_cache_is_not_found() {
        let repo = ChainRepository::new(Arc::new(InMemoryCache::new()), Arc::new(failing_store()));

        let error = assert_err!(repo.resolve(&ChainId::new("1-missing").unwrap()).await);
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_cache_fault_falls_through_to_store() {
        let store = Arc::new(InMemoryChainStore::new());
        let seeded = ChainRepository::new(Arc::new(InMemoryCache::new()), store.clone())
            .create(new_chain("alice"), "http://x")
            .await
            .unwrap();

        let repo = ChainRepository::new(Arc::new(MockCache::new().with_error("poisoned")), store);
        let resolved = repo.resolve(seeded.chain.id()).await.unwrap();
        assert_eq!(resolved.id(), seeded.chain.id());
    }

    #[tokio::test]
    async fn test_resolve_by_prefix() {
        let (repo, cache, _) = repository();
        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();
        let suffix = created.chain.id().as_str().rsplit('-').next().unwrap().to_string();

        cache.clear().await.unwrap();
        let found = repo.resolve_by_prefix(&suffix).await.unwrap();
        assert_eq!(found.id(), created.chain.id());

        let error = assert_err!(repo.resolve_by_prefix("zzzzzzzzzzzz").await);
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_by_prefix_rejects_short_slug() {
        let (repo, _, _) = repository();
        let error = assert_err!(repo.resolve_by_prefix("abc").await);
        assert!(error.is_validation());
    }

    #[tokio::test]
    async fn test_resolve_by_prefix_scans_cache_when_store_down() {
        let repo = ChainRepository::new(Arc::new(InMemoryCache::new()), Arc::new(failing_store()));
        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();
        let suffix = created.chain.id().as_str().rsplit('-').next().unwrap().to_string();

        let found = repo.resolve_by_prefix(&suffix).await.unwrap();
        assert_eq!(found.id(), created.chain.id());
    }

    #[tokio::test]
    async fn test_list_for_owner_newest_first() {
        let (repo, _, _) = repository();
        let first = repo.create(new_chain("alice"), "http://x").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.create(new_chain("alice"), "http://x").await.unwrap();
        repo.create(new_chain("bob"), "http://x").await.unwrap();

        let listed = repo.list_for_owner("alice").await.unwrap();
        let ids: Vec<&ChainId> = listed.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![second.chain.id(), first.chain.id()]);
    }

    #[tokio::test]
    async fn test_locate() {
        let (repo, cache, _) = repository();
        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();
        cache.clear().await.unwrap();

        let location = repo.locate(created.chain.id()).await;
        assert!(!location.in_cache);
        assert!(location.in_store);
        assert_eq!(location.owner_id.as_deref(), Some("alice"));
        assert!(location.has_credential);

        let missing = repo.locate(&ChainId::new("1-nothere").unwrap()).await;
        assert!(!missing.in_cache && !missing.in_store);
        assert!(missing.owner_id.is_none());
    }

    #[tokio::test]
    async fn test_locate_reports_store_error() {
        let repo = ChainRepository::new(Arc::new(InMemoryCache::new()), Arc::new(failing_store()));
        let created = repo.create(new_chain("alice"), "http://x").await.unwrap();

        let location = repo.locate(created.chain.id()).await;
        assert!(location.in_cache);
        assert!(!location.in_store);
        assert!(location.store_error.is_some());
    }
}
