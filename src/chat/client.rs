use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::chat::types::{Message, StreamEvent};

/// Errors that can occur while talking to a completion server.
/// Variants carry enough info to determine retryability (future use).
#[derive(Debug)]
pub enum ClientError {
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// Server returned an error response. Retryable if status >= 500 or 429.
    Api { status: u16, message: String },
    /// Failed to parse the server's response. Not retryable.
    Parse(String),
    /// The mpsc channel was closed (UI dropped the receiver). Not retryable.
    ChannelClosed,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Api { status, message } => {
                write!(f, "server error (HTTP {status}): {message}")
            }
            ClientError::Parse(msg) => write!(f, "parse error: {msg}"),
            ClientError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Everything a client needs to run one completion turn.
pub struct ChatRequest<'a> {
    /// Conversation history, oldest first. Never includes the in-flight
    /// assistant placeholder.
    pub history: &'a [Message],
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Abstraction over a chat-completion backend.
///
/// The app receives a client instance at construction time; tests inject
/// a stub, the binary injects [`OpenAiClient`](crate::chat::openai::OpenAiClient).
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the name of the client backend.
    fn name(&self) -> &str;

    /// Streams a completion, sending increments to the provided channel.
    /// Sends [`StreamEvent::Done`] exactly once on success, after the last delta.
    async fn stream_chat(
        &self,
        request: ChatRequest<'_>,
        sender: Sender<StreamEvent>,
    ) -> Result<(), ClientError>;

    /// Whether the backend is reachable. Used for the title-bar indicator.
    async fn healthy(&self) -> bool {
        true
    }
}
