//! Durable chain store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::{ChainDefinition, ChainId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable, owner-namespaced document store for chains
///
/// Layout is `owner_id -> chain_id -> document`. The lookup helpers have
/// default implementations that scan every owner; backends with an index
/// should override them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainStore: Send + Sync + Debug {
    /// Write a chain document under its owner's namespace
    async fn put(&self, chain: &ChainDefinition) -> Result<(), DomainError>;

    /// Read a single document from an owner's namespace
    async fn get(&self, owner_id: &str, id: &ChainId)
        -> Result<Option<ChainDefinition>, DomainError>;

    /// Enumerate owner namespaces
    async fn list_owners(&self) -> Result<Vec<String>, DomainError>;

    /// All chains of one owner, in no particular order
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError>;

    /// Find a chain by exact identifier across all owners
    async fn find(&self, id: &ChainId) -> Result<Option<ChainDefinition>, DomainError> {
        for owner_id in self.list_owners().await? {
            if let Some(chain) = self.get(&owner_id, id).await? {
                return Ok(Some(chain));
            }
        }

        Ok(None)
    }

    /// Find the first chain whose identifier contains `fragment`
    async fn find_by_fragment(
        &self,
        fragment: &str,
    ) -> Result<Option<ChainDefinition>, DomainError> {
        for owner_id in self.list_owners().await? {
            let found = self
                .list_for_owner(&owner_id)
                .await?
                .into_iter()
                .find(|chain| chain.id().as_str().contains(fragment));

            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }

    /// Reachability check
    async fn health_check(&self) -> Result<(), DomainError> {
        self.list_owners().await.map(|_| ())
    }
}
