//! In-memory chain store (for testing/development)

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::chain::{ChainDefinition, ChainId, ChainStore};
use crate::domain::DomainError;

type Namespace = HashMap<String, ChainDefinition>;

/// Chain store held in process memory, namespaced by owner
///
/// Stands in for the durable tier in tests and single-process setups;
/// contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    owners: RwLock<HashMap<String, Namespace>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error() -> DomainError {
        DomainError::storage("Failed to acquire chain store lock")
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn put(&self, chain: &ChainDefinition) -> Result<(), DomainError> {
        let mut owners = self.owners.write().map_err(|_| Self::lock_error())?;

        owners
            .entry(chain.owner_id().to_string())
            .or_default()
            .insert(chain.id().to_string(), chain.clone());

        Ok(())
    }

    async fn get(
        &self,
        owner_id: &str,
        id: &ChainId,
    ) -> Result<Option<ChainDefinition>, DomainError> {
        let owners = self.owners.read().map_err(|_| Self::lock_error())?;

        Ok(owners
            .get(owner_id)
            .and_then(|namespace| namespace.get(id.as_str()))
            .cloned())
    }

    async fn list_owners(&self) -> Result<Vec<String>, DomainError> {
        let owners = self.owners.read().map_err(|_| Self::lock_error())?;
        Ok(owners.keys().cloned().collect())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        let owners = self.owners.read().map_err(|_| Self::lock_error())?;

        Ok(owners
            .get(owner_id)
            .map(|namespace| namespace.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{ChainEndpoint, ChainOwner, ChainStep};
    use crate::domain::Credential;

    fn chain(owner: &str, id: &str) -> ChainDefinition {
        let owner = ChainOwner::new(owner, format!("{}@example.com", owner));
        let id = ChainId::new(id).unwrap();
        let endpoint = ChainEndpoint::build("http://localhost", &owner, &id);
        ChainDefinition::new(
            id,
            vec![ChainStep::new(1, "uppercase", "text")],
            Credential::new("sk-test"),
            &owner,
            endpoint,
        )
    }

    #[tokio::test]
    async fn test_put_and_get_in_owner_namespace() {
        let store = InMemoryChainStore::new();
        let stored = chain("alice", "1700000000000-aaaaaaaa");
        store.put(&stored).await.unwrap();

        let found = store.get("alice", stored.id()).await.unwrap();
        assert_eq!(found, Some(stored.clone()));

        assert!(store.get("bob", stored.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_scans_all_owners() {
        let store = InMemoryChainStore::new();
        store.put(&chain("alice", "1-aaaaaaaa")).await.unwrap();
        store.put(&chain("bob", "2-bbbbbbbb")).await.unwrap();

        let found = store.find(&ChainId::new("2-bbbbbbbb").unwrap()).await.unwrap();
        assert_eq!(found.map(|c| c.owner_id().to_string()), Some("bob".to_string()));

        assert!(store.find(&ChainId::new("3-cccccccc").unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_fragment() {
        let store = InMemoryChainStore::new();
        store.put(&chain("alice", "1700000000000-abcd1234")).await.unwrap();

        let found = store.find_by_fragment("abcd").await.unwrap();
        assert!(found.is_some());
        assert!(store.find_by_fragment("zzzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_owner() {
        let store = InMemoryChainStore::new();
        store.put(&chain("alice", "1-aaaaaaaa")).await.unwrap();
        store.put(&chain("alice", "2-aaaaaaaa")).await.unwrap();
        store.put(&chain("bob", "3-bbbbbbbb")).await.unwrap();

        assert_eq!(store.list_for_owner("alice").await.unwrap().len(), 2);
        assert!(store.list_for_owner("carol").await.unwrap().is_empty());
        assert!(store.health_check().await.is_ok());
    }
}
