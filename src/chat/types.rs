use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// How a message body should be rendered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Markdown,
    Html,
    Json,
}

/// Delivery state of a message.
///
/// `Sending` marks the in-flight assistant placeholder while chunks stream in.
/// At most one message in a conversation may be `Sending` at a time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Sending,
    #[default]
    Sent,
    Error,
    Editing,
}

/// A single chat message.
///
/// Field names follow the export file format (camelCase `contentType`),
/// so exported history is readable by other frontends of the same server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(rename = "contentType", default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// A finished user message, ready to send.
    pub fn user(content: String) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            content,
            content_type: ContentType::Text,
            timestamp: now_ms(),
            status: Status::Sent,
            error: None,
        }
    }

    /// The empty assistant placeholder that accumulates streamed chunks.
    pub fn pending_assistant() -> Self {
        Self {
            id: new_id(),
            role: Role::Assistant,
            content: String::new(),
            content_type: ContentType::Text,
            timestamp: now_ms(),
            status: Status::Sending,
            error: None,
        }
    }
}

/// Generate a new UUID v4 message ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One increment of a streamed assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of reply text, in arrival order.
    Delta(String),
    /// The stream finished normally. Sent exactly once, after the last delta.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_camel_case_content_type() {
        let msg = Message::user("hi".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"contentType\":\"text\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"status\":\"sent\""));
        // error is None → omitted entirely
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_message_deserializes_with_missing_optional_fields() {
        let json = r#"{"id":"m1","role":"assistant","content":"hello","timestamp":1700000000000}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content_type, ContentType::Text);
        assert_eq!(msg.status, Status::Sent);
        assert!(msg.error.is_none());
    }

    #[test]
    fn test_pending_assistant_is_sending_and_empty() {
        let msg = Message::pending_assistant();
        assert_eq!(msg.status, Status::Sending);
        assert!(msg.content.is_empty());
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
