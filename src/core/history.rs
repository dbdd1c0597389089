//! Conversation persistence.
//!
//! The whole conversation is one JSON blob, rewritten wholesale after every
//! completed mutation. All file writes use atomic rename (write `.tmp`, then
//! `rename()`) for crash safety. Failures are logged and swallowed — the UI
//! keeps working in memory even when persistence is broken.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, warn};

use crate::chat::types::{Message, Status};

/// Storage seam injected into the app state. The binary uses
/// [`JsonFileHistory`]; tests use [`MemoryHistory`].
pub trait HistoryStore: Send {
    /// Load the saved conversation. Empty if absent or corrupt, never fails.
    fn load(&self) -> Vec<Message>;

    /// Persist the conversation, best effort. In-flight placeholders are
    /// dropped so a crash mid-stream never resurrects a half-written reply.
    fn save(&self, messages: &[Message]);
}

/// History persisted to `~/.parrot/history.json`.
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the default path `~/.parrot/history.json`, or `None` when the
    /// home directory can't be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".parrot").join("history.json"))
    }

    fn write_atomic(&self, messages: &[Message]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(messages)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> Vec<Message> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Corrupt history {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save(&self, messages: &[Message]) {
        let persistable = persistable(messages);
        match self.write_atomic(&persistable) {
            Ok(()) => debug!(
                "Saved {} messages to {}",
                persistable.len(),
                self.path.display()
            ),
            Err(e) => warn!("Failed to save history {}: {}", self.path.display(), e),
        }
    }
}

/// In-memory store for tests and for runs without a usable home directory.
#[derive(Default)]
pub struct MemoryHistory {
    messages: Mutex<Vec<Message>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Vec<Message> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save(&self, messages: &[Message]) {
        let persistable = persistable(messages);
        match self.messages.lock() {
            Ok(mut guard) => *guard = persistable,
            Err(poisoned) => *poisoned.into_inner() = persistable,
        }
    }
}

/// Snapshot a conversation for storage. In-flight placeholders are dropped;
/// a message mid-edit kept its saved content, so it is stored as settled.
fn persistable(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| m.status != Status::Sending)
        .cloned()
        .map(|mut m| {
            if m.status == Status::Editing {
                m.status = Status::Sent;
            }
            m
        })
        .collect()
}
