//! Chain domain - compiled chains, their durable store, and execution

mod entity;
mod executor;
mod repository;

pub use entity::{
    process_url, ChainDefinition, ChainEndpoint, ChainId, ChainOwner, ChainStep, PORT_RANGE,
};
pub use executor::{
    build_system_message, default_allowed_models, ChainExecutor, ChainExecutorConfig,
    ChainResult, EmptyCompletionPolicy, PreviewConfig, PromptStyle, RunStatus, StepPreview,
    StepResult, EMPTY_COMPLETION_PLACEHOLDER,
};
pub use repository::ChainStore;

#[cfg(test)]
pub use repository::MockChainStore;
