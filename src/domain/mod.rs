//! Domain layer - Core business logic and entities

pub mod cache;
pub mod chain;
pub mod credentials;
pub mod error;
pub mod llm;

pub use cache::{Cache, CacheExt};
pub use chain::{
    ChainDefinition, ChainEndpoint, ChainExecutor, ChainExecutorConfig, ChainId, ChainOwner,
    ChainResult, ChainStep, ChainStore, EmptyCompletionPolicy, PromptStyle, RunStatus,
    StepPreview, StepResult,
};
pub use credentials::Credential;
pub use error::{DomainError, UpstreamErrorKind};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    ProviderResolver, StaticProviderResolver, Usage,
};
