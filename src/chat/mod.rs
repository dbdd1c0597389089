//! Chat domain types and the completion-server client.

pub mod client;
pub mod openai;
pub mod types;
pub mod wire;

pub use client::{ChatClient, ChatRequest, ClientError};
pub use openai::OpenAiClient;
pub use types::{ContentType, Message, Role, Status, StreamEvent};
