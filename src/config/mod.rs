//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_RELAY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod ai;
mod chat;
mod error;
mod server;

pub use ai::AiConfig;
pub use chat::ChatConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment prefix for all settings.
pub const ENV_PREFIX: &str = "CHAT_RELAY";

/// Unprefixed variable names honoured as fallbacks, with the key they fill.
const LEGACY_ENV_VARS: [(&str, &str); 3] = [
    ("OPENAI_API_KEY", "ai.openai_api_key"),
    ("OPENAI_MODEL", "ai.model"),
    ("PORT", "server.port"),
];

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion provider configuration (OpenAI)
    #[serde(default)]
    pub ai: AiConfig,

    /// Chat behaviour (history, system prompt, relay buffer)
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Seeds `OPENAI_API_KEY`, `OPENAI_MODEL` and `PORT` as defaults
    /// 3. Reads environment variables with `CHAT_RELAY` prefix
    /// 4. Uses `__` (double underscore) to separate nested values
    /// 5. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__AI__MODEL=gpt-4o` -> `ai.model = gpt-4o`
    ///
    /// Prefixed variables win over the unprefixed fallbacks.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        for (var, key) in LEGACY_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(key, value)?;
            }
        }

        let config = builder
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid. A
    /// missing API key is not an error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.chat.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
