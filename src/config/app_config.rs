use std::time::Duration;

use serde::Deserialize;

use crate::domain::chain::{
    default_allowed_models, ChainExecutorConfig, EmptyCompletionPolicy, PreviewConfig,
    PromptStyle,
};
use crate::domain::{Credential, DomainError};
use crate::infrastructure::llm::DEFAULT_OPENAI_BASE_URL;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub public: PublicConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Durable chain store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub table_name: String,
}

/// Process-local chain cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_capacity: u64,
}

/// Completion service and executor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-step deadline; `0` disables it
    pub step_timeout_secs: u64,
    pub prompt_style: PromptStyle,
    pub empty_completion: EmptyCompletionPolicy,
    /// Only used by design-time previews
    pub fallback_api_key: Option<String>,
    pub allowed_models: Vec<String>,
    pub preview_model: String,
    pub preview_temperature: f32,
    pub preview_max_tokens: u32,
}

/// Public addressing of generated chain URLs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicConfig {
    /// Overrides the scheme and host derived from the request's `Host` header
    pub base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: None,
            max_connections: 10,
            table_name: "chains".to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let executor = ChainExecutorConfig::default();
        let preview = PreviewConfig::default();

        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: executor.model,
            temperature: executor.temperature,
            max_tokens: executor.max_tokens,
            step_timeout_secs: 60,
            prompt_style: executor.prompt_style,
            empty_completion: executor.empty_completion,
            fallback_api_key: None,
            allowed_models: default_allowed_models(),
            preview_model: preview.default_model,
            preview_temperature: preview.temperature,
            preview_max_tokens: preview.max_tokens,
        }
    }
}

impl CompletionConfig {
    pub fn executor_config(&self) -> ChainExecutorConfig {
        ChainExecutorConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            step_timeout: (self.step_timeout_secs > 0)
                .then(|| Duration::from_secs(self.step_timeout_secs)),
            prompt_style: self.prompt_style,
            empty_completion: self.empty_completion,
            fallback_credential: Credential::non_empty(self.fallback_api_key.clone()),
            preview: PreviewConfig {
                default_model: self.preview_model.clone(),
                allowed_models: self.allowed_models.clone(),
                temperature: self.preview_temperature,
                max_tokens: self.preview_max_tokens,
            },
        }
    }
}

impl StorageSettings {
    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        match StorageType::parse(&self.backend) {
            Some(StorageType::InMemory) => Ok(StorageConfig::in_memory()),
            Some(StorageType::Postgres) => {
                let url = self.database_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("storage.database_url is required for postgres")
                })?;

                Ok(StorageConfig::postgres(
                    PostgresConfig::new(url)
                        .with_max_connections(self.max_connections)
                        .with_table_name(self.table_name.clone()),
                ))
            }
            None => Err(DomainError::configuration(format!(
                "Unknown storage backend: {}. Valid backends: memory, postgres",
                self.backend
            ))),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("completion.allowed_models")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
