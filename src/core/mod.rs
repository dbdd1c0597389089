//! # Core Application Logic
//!
//! Conversation state, the action reducer, and everything else the chat
//! needs that knows nothing about terminals or HTTP.
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct — all application state in one place
//! - [`action`]: The `Action` enum and `update()` reducer
//! - [`content`]: Content type detection for finished replies
//! - [`search`]: Case-insensitive search over the conversation
//! - [`export`]: Versioned chat export/import
//! - [`history`]: Persistence behind the `HistoryStore` trait
//! - [`config`]: Settings with defaults → file → env → CLI resolution

pub mod action;
pub mod config;
pub mod content;
pub mod export;
pub mod history;
pub mod search;
pub mod state;

pub use action::{Action, Effect, update};
pub use state::App;
