//! Prompt assembly.
//!
//! A prompt is always shaped as one system turn, then the bounded history in
//! chronological order, then exactly one new user turn.

use crate::domain::errors::ValidationError;

use super::turn::{Role, Turn};

/// Ordered message sequence sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    turns: Vec<Turn>,
}

impl PromptRequest {
    /// All turns in send order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// A prompt always holds at least the system and user turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The leading system turn.
    pub fn system(&self) -> &Turn {
        &self.turns[0]
    }

    /// The trailing user turn.
    pub fn user(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }

    /// The history turns between system and user.
    pub fn history(&self) -> &[Turn] {
        &self.turns[1..self.turns.len() - 1]
    }
}

/// Builds prompts around a fixed system instruction.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_instruction: String,
}

impl PromptAssembler {
    /// Creates an assembler for the given system instruction.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Builds a prompt from history and the new user message.
    pub fn build(
        &self,
        history: &[Turn],
        user_message: &str,
    ) -> Result<PromptRequest, ValidationError> {
        build_prompt(&self.system_instruction, history, user_message)
    }
}

/// Assembles `system, history..., user` into a [`PromptRequest`].
///
/// # Errors
///
/// Returns `ValidationError::EmptyField` when the user message or the system
/// instruction is empty or whitespace-only.
pub fn build_prompt(
    system_instruction: &str,
    history: &[Turn],
    user_message: &str,
) -> Result<PromptRequest, ValidationError> {
    if system_instruction.trim().is_empty() {
        return Err(ValidationError::empty_field("system_instruction"));
    }

    let message = user_message.trim();
    if message.is_empty() {
        return Err(ValidationError::empty_field("message"));
    }

    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(Turn::system(system_instruction));
    turns.extend(
        history
            .iter()
            .filter(|turn| turn.role() != Role::System)
            .cloned(),
    );
    turns.push(Turn::user(message));

    Ok(PromptRequest { turns })
}
