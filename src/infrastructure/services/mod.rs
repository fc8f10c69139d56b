//! Infrastructure services

mod chain_repository;
mod chain_service;

pub use chain_repository::{
    ChainLocation, ChainRepository, CreatedChain, NewChain, PersistenceStatus, MIN_SLUG_LEN,
};
pub use chain_service::{ChainRun, ChainService};
