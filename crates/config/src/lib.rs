//! Configuration management for the intent/goal resolution engine
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`VOICE_INTENT__` prefix, `__` separator)
//! - Fixture files for the in-memory data source

pub mod data_source;
pub mod engine;
pub mod settings;

pub use data_source::{DataSourceSettings, FixtureView, Fixtures};
pub use engine::{EngineSettings, FallbackTemplates};
pub use settings::{
    load_settings, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
