//! Cache domain - fast, process-local tier in front of the chain store

mod repository;

pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
