//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout (must be 1..=300 seconds)")]
    InvalidTimeout,

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Temperature must be between 0 and 2")]
    InvalidTemperature,

    #[error("max_tokens must be greater than zero")]
    InvalidMaxTokens,

    #[error("history_limit must be greater than zero")]
    InvalidHistoryLimit,

    #[error("relay_buffer must be greater than zero")]
    InvalidRelayBuffer,
}
