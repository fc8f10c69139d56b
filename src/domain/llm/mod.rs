//! Completion service domain models and traits

mod message;
mod provider;
mod provider_resolver;
mod request;
mod response;

pub use message::{Message, MessageRole};
pub use provider::LlmProvider;
pub use provider_resolver::{ProviderResolver, StaticProviderResolver};
pub use request::{LlmRequest, LlmRequestBuilder};
pub use response::{FinishReason, LlmResponse, Usage};

#[cfg(test)]
pub use provider::mock::ScriptedLlmProvider;
