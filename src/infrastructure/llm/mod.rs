//! Completion service client implementations

mod http_client;
mod openai;
mod resolver;

pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{OpenAiProvider, DEFAULT_OPENAI_BASE_URL};
pub use resolver::OpenAiProviderResolver;
