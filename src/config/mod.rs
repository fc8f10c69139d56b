//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, CompletionConfig, LogFormat, LoggingConfig, PublicConfig,
    ServerConfig, StorageSettings,
};
