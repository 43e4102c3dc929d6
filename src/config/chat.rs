//! Chat behaviour configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::conversation::{COMPLIANCE_KNOWLEDGE, DEFAULT_HISTORY_LIMIT};

/// Chat configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Maximum turns of history sent with a message
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Replaces the built-in system instruction when set
    pub system_prompt: Option<String>,

    /// Capacity of the outbound fragment channel
    #[serde(default = "default_relay_buffer")]
    pub relay_buffer: usize,
}

impl ChatConfig {
    /// The system instruction in effect.
    pub fn system_instruction(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(COMPLIANCE_KNOWLEDGE)
    }

    /// Validate chat configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_limit == 0 {
            return Err(ValidationError::InvalidHistoryLimit);
        }
        if self.relay_buffer == 0 {
            return Err(ValidationError::InvalidRelayBuffer);
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            system_prompt: None,
            relay_buffer: default_relay_buffer(),
        }
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_relay_buffer() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_config_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.relay_buffer, 32);
        assert_eq!(config.system_instruction(), COMPLIANCE_KNOWLEDGE);
    }

    #[test]
    fn test_system_prompt_override() {
        let config = ChatConfig {
            system_prompt: Some("You are terse.".to_string()),
            ..Default::default()
        };
        assert_eq!(config.system_instruction(), "You are terse.");

        let blank = ChatConfig {
            system_prompt: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.system_instruction(), COMPLIANCE_KNOWLEDGE);
    }

    #[test]
    fn test_validation_zero_limits() {
        let config = ChatConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidHistoryLimit));

        let config = ChatConfig {
            relay_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRelayBuffer));
    }
}
