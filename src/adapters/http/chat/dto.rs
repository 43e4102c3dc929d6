//! Request and response bodies for the chat endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Role, Turn};
use crate::ports::TokenUsage;

/// Body of `POST /api/chat` and `POST /api/chat/simple`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

/// One client-held history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    /// Converts to a turn. Unknown roles yield `None`.
    pub fn to_turn(&self) -> Option<Turn> {
        let role = match self.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => return None,
        };
        Some(Turn::new(role, self.content.clone()))
    }
}

impl ChatRequest {
    /// History entries as turns, skipping entries with unknown roles.
    pub fn history_turns(&self) -> Vec<Turn> {
        self.conversation_history
            .iter()
            .flatten()
            .filter_map(|entry| {
                let turn = entry.to_turn();
                if turn.is_none() {
                    tracing::debug!(role = %entry.role, "Skipping history entry with unknown role");
                }
                turn
            })
            .collect()
    }
}

/// Body of a successful `POST /api/chat/simple`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleChatResponse {
    pub response: String,
    pub usage: TokenUsage,
}
