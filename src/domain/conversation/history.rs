//! Bounded rolling conversation history.
//!
//! The buffer keeps the most recent `limit` user/assistant turns in
//! chronological order. Appending past the limit evicts the oldest turns
//! first. System instructions never live here; they are injected fresh for
//! every prompt.

use std::collections::VecDeque;

use super::turn::{Role, Turn};

/// Default number of turns kept (ten exchanges).
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Bounded, append-only log of conversation turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl HistoryBuffer {
    /// Creates an empty buffer keeping at most `limit` turns.
    ///
    /// A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            turns: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Rebuilds a buffer from an externally supplied history.
    ///
    /// Turns are appended in order, so only the most recent `limit` survive.
    pub fn from_turns(turns: impl IntoIterator<Item = Turn>, limit: usize) -> Self {
        let mut buffer = Self::new(limit);
        for turn in turns {
            buffer.append(turn);
        }
        buffer
    }

    /// Appends a turn, evicting the oldest turns beyond the limit.
    ///
    /// System turns are discarded.
    pub fn append(&mut self, turn: Turn) {
        if turn.role() == Role::System {
            tracing::warn!("Discarding system turn appended to conversation history");
            return;
        }

        self.turns.push_back(turn);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    /// Returns a detached copy of the current turns, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Removes every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Maximum number of turns kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
