//! Chain store factory for runtime backend selection

use std::sync::Arc;

use crate::domain::chain::ChainStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryChainStore;
use super::postgres::{PostgresChainStore, PostgresConfig};

/// Supported durable backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// Process memory (for testing/development)
    InMemory,
    /// PostgreSQL
    Postgres,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating chain store instances
#[derive(Debug)]
pub struct ChainStoreFactory;

impl ChainStoreFactory {
    /// Creates a chain store based on the configuration
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn ChainStore>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryChainStore::new())),
            StorageConfig::Postgres(pg_config) => {
                Ok(Arc::new(PostgresChainStore::connect(pg_config).await?))
            }
        }
    }
}
