//! Conversation turns.

use serde::{Deserialize, Serialize};

/// Role of the speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl Role {
    /// Wire name used by the completion API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message exchanged in a conversation.
///
/// Fields are private so a turn cannot change once it has been recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
    interrupted: bool,
}

impl Turn {
    /// Creates a new turn.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            interrupted: false,
        }
    }

    /// Creates a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates an assistant turn whose response stream terminated early.
    pub fn interrupted_assistant(content: impl Into<String>) -> Self {
        Self {
            interrupted: true,
            ..Self::assistant(content)
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the assistant response was cut off mid-stream.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}
