//! Completion service credentials owned by chains

mod credential;

pub use credential::Credential;
