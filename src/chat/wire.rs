//! OpenAI-style chat-completion wire types, shared by the HTTP client and
//! the mock server so both sides serialize the exact same shapes.

use serde::{Deserialize, Serialize};

use crate::chat::types::Message;

/// Terminal SSE frame payload marking the end of a stream.
pub const DONE_FRAME: &str = "[DONE]";

/// A `{role, content}` pair as it appears on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default)]
    pub stream: bool,
}

/// Non-streaming response body (`object: "chat.completion"`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Completion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Choice {
    pub index: u32,
    pub message: WireMessage,
    pub finish_reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One streamed SSE frame body (`object: "chat.completion.chunk"`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Incremental payload inside a chunk choice. The first frame carries the
/// role, word frames carry content, and the final frame carries neither.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
