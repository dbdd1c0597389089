//! # Application State
//!
//! Core business state. This module contains domain logic only — no
//! TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── client: Arc<dyn ChatClient>    // completion backend (injected)
//! ├── history: Box<dyn HistoryStore> // persistence seam (injected)
//! ├── messages: Vec<Message>         // the conversation
//! ├── is_streaming: bool             // a turn is in flight
//! ├── turn: u64                      // stale-callback guard
//! ├── error: Option<String>          // dismissible banner
//! ├── editing: Option<usize>         // in-place edit target
//! ├── search: SearchState            // query + match cursor
//! └── status_message, model_name, …  // title bar props
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.
//! This keeps things predictable, so no surprise mutations.

use std::sync::Arc;

use crate::chat::client::ChatClient;
use crate::chat::types::{Message, Status};
use crate::core::config::ResolvedConfig;
use crate::core::history::HistoryStore;
use crate::core::search::SearchState;

pub struct App {
    /// Completion backend. Shared with background request tasks.
    pub client: Arc<dyn ChatClient>,
    /// Storage seam. Only `persist()` touches it.
    history: Box<dyn HistoryStore>,
    /// The conversation, oldest first. Mutated only by the reducer.
    pub messages: Vec<Message>,
    /// True while a turn is in flight (placeholder accumulating chunks).
    pub is_streaming: bool,
    /// Sequence number of the current turn. Stream callbacks carry the turn
    /// they belong to; callbacks from cancelled or superseded turns are
    /// dropped by comparing against this.
    pub turn: u64,
    /// Transient error banner, dismissible.
    pub error: Option<String>,
    /// Index of the message being edited in place, if any. The edit buffer
    /// itself lives in the input box; the message keeps its saved content
    /// until the edit is submitted.
    pub editing: Option<usize>,
    pub search: SearchState,
    /// Transient status text for the title bar.
    pub status_message: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Result of the last health probe against the completion server.
    pub server_online: bool,
}

impl App {
    pub fn new(
        client: Arc<dyn ChatClient>,
        history: Box<dyn HistoryStore>,
        model_name: String,
    ) -> Self {
        let messages = history.load();
        Self {
            client,
            history,
            messages,
            is_streaming: false,
            turn: 0,
            error: None,
            editing: None,
            search: SearchState::default(),
            status_message: String::new(),
            model_name,
            max_tokens: 1000,
            temperature: 0.7,
            server_online: true,
        }
    }

    pub fn from_config(
        client: Arc<dyn ChatClient>,
        history: Box<dyn HistoryStore>,
        config: &ResolvedConfig,
    ) -> Self {
        let mut app = Self::new(client, history, config.model.clone());
        app.max_tokens = config.max_tokens;
        app.temperature = config.temperature;
        app
    }

    /// Write the conversation through the history store. Best effort.
    pub fn persist(&self) {
        self.history.save(&self.messages);
    }

    /// The history to send with a request: everything except the in-flight
    /// placeholder.
    pub fn request_context(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.status != Status::Sending)
            .cloned()
            .collect()
    }

    /// Content of the message currently being edited, if any.
    pub fn editing_content(&self) -> Option<&str> {
        self.editing
            .and_then(|i| self.messages.get(i))
            .map(|m| m.content.as_str())
    }

    /// The in-flight assistant placeholder, if this turn is still live.
    pub fn pending_message_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .last_mut()
            .filter(|m| m.status == Status::Sending)
    }
}
