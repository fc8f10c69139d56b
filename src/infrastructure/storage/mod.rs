//! Storage infrastructure - durable chain store implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::{ChainStoreFactory, StorageConfig, StorageType};
pub use in_memory::InMemoryChainStore;
pub use postgres::{PostgresChainStore, PostgresConfig};
