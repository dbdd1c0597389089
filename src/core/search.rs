//! Case-insensitive substring search over the conversation.

use crate::chat::types::Message;

/// Search query, match positions, and the cycling cursor.
///
/// `matches` holds message indices in ascending order. `current` is an index
/// into `matches` (not into the conversation), or `None` when there are no
/// matches. Recomputed in full whenever the query or conversation changes.
#[derive(Debug, Default, Clone)]
pub struct SearchState {
    pub query: String,
    pub matches: Vec<usize>,
    pub current: Option<usize>,
}

impl SearchState {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Replace the query and recompute matches from scratch.
    pub fn set_query(&mut self, query: &str, messages: &[Message]) {
        self.query = query.to_string();
        self.current = None;
        self.recompute(messages);
    }

    /// Rescan the conversation for the current query. Keeps `current` on a
    /// valid entry by clamping, so a shrinking match set doesn't strand it.
    pub fn recompute(&mut self, messages: &[Message]) {
        if self.query.is_empty() {
            self.matches.clear();
            self.current = None;
            return;
        }

        let needle = self.query.to_lowercase();
        self.matches = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.content.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();

        self.current = if self.matches.is_empty() {
            None
        } else {
            Some(self.current.unwrap_or(0).min(self.matches.len() - 1))
        };
    }

    /// Advance to the next match, wrapping around. No-op with zero matches.
    pub fn next(&mut self) {
        let count = self.matches.len();
        if count == 0 {
            return;
        }
        self.current = Some(self.current.map_or(0, |i| (i + 1) % count));
    }

    /// Step back to the previous match, wrapping around. No-op with zero matches.
    pub fn previous(&mut self) {
        let count = self.matches.len();
        if count == 0 {
            return;
        }
        self.current = Some(self.current.map_or(0, |i| (i + count - 1) % count));
    }

    /// Conversation index of the current match, if any.
    pub fn current_message(&self) -> Option<usize> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }
}
