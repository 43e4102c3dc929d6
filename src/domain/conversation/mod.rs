//! Conversation domain module.
//!
//! Turns, the bounded history a session keeps between requests, and the
//! assembly of those into prompts for the completion provider.

mod history;
mod instructions;
mod prompt;
mod turn;

pub use history::{HistoryBuffer, DEFAULT_HISTORY_LIMIT};
pub use instructions::COMPLIANCE_KNOWLEDGE;
pub use prompt::{build_prompt, PromptAssembler, PromptRequest};
pub use turn::{Role, Turn};
