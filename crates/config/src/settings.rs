//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, DataSourceSettings, EngineSettings};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation engine configuration
    #[serde(default)]
    pub engine: EngineSettings,

    /// Data source configuration
    #[serde(default)]
    pub data_source: DataSourceSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file, bypassing environment overrides
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let settings: Settings =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.engine.max_template_expansions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_template_expansions".to_string(),
                message: "At least one expansion per template is required".to_string(),
            });
        }

        if self.data_source.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "data_source.timeout_ms".to_string(),
                message: "Timeout must be positive".to_string(),
            });
        }

        if self.data_source.field_marker.is_alphanumeric()
            || self.data_source.field_marker.is_whitespace()
        {
            return Err(ConfigError::InvalidValue {
                field: "data_source.field_marker".to_string(),
                message: format!(
                    "Marker must be punctuation, got `{}`",
                    self.data_source.field_marker
                ),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Enable CORS restrictions
    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            cors_enabled: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and
/// `VOICE_INTENT__*` environment variables, in increasing priority.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_INTENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        env = env.unwrap_or("default"),
        environment = ?settings.environment,
        "Settings loaded"
    );

    Ok(settings)
}
