//! Chat export/import in the versioned JSON interchange format.
//!
//! `{version: "1.0", timestamp, messages: [...]}`. Import is all-or-nothing:
//! any malformed message aborts the whole operation with a descriptive error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::types::{Message, now_ms};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug)]
struct ChatExport {
    version: String,
    timestamp: i64,
    messages: Vec<Message>,
}

#[derive(Debug)]
pub enum ImportError {
    /// Input is not valid JSON, or messages don't deserialize.
    Malformed(String),
    /// `version` is missing or not exactly "1.0".
    UnsupportedVersion(String),
    /// `messages` is missing or not an array.
    MessagesNotArray,
    /// A message is missing a required string field or it is empty.
    InvalidMessage { index: usize, field: &'static str },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Malformed(msg) => write!(f, "malformed JSON: {msg}"),
            ImportError::UnsupportedVersion(v) => {
                write!(f, "unsupported export version {v:?} (expected {EXPORT_VERSION:?})")
            }
            ImportError::MessagesNotArray => write!(f, "\"messages\" must be an array"),
            ImportError::InvalidMessage { index, field } => {
                write!(f, "message {index} is missing a valid {field:?} field")
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Serialize the conversation into the interchange format.
pub fn export_chat(messages: &[Message]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ChatExport {
        version: EXPORT_VERSION.to_string(),
        timestamp: now_ms(),
        messages: messages.to_vec(),
    })
}

/// Parse and validate an export file. Returns the full message list, or the
/// first violation found — never a partial import.
pub fn import_chat(json: &str) -> Result<Vec<Message>, ImportError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ImportError::Malformed(e.to_string()))?;

    let version = value.get("version").and_then(Value::as_str).unwrap_or("");
    if version != EXPORT_VERSION {
        return Err(ImportError::UnsupportedVersion(version.to_string()));
    }

    let Some(items) = value.get("messages").and_then(Value::as_array) else {
        return Err(ImportError::MessagesNotArray);
    };

    for (index, item) in items.iter().enumerate() {
        for field in ["id", "role", "content"] {
            let present = item
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(ImportError::InvalidMessage { index, field });
            }
        }
    }

    serde_json::from_value(Value::Array(items.clone()))
        .map_err(|e| ImportError::Malformed(e.to_string()))
}
