//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::chat::client::{ChatClient, ChatRequest, ClientError};
use crate::chat::types::StreamEvent;
use crate::core::history::MemoryHistory;
use crate::core::state::App;

/// A no-op client for tests that don't need real completions.
pub struct NoopClient;

#[async_trait]
impl ChatClient for NoopClient {
    fn name(&self) -> &str {
        "noop"
    }

    async fn stream_chat(
        &self,
        _request: ChatRequest<'_>,
        sender: Sender<StreamEvent>,
    ) -> Result<(), ClientError> {
        let _ = sender.send(StreamEvent::Done).await;
        Ok(())
    }
}

/// Creates a test App with a NoopClient and in-memory history.
pub fn test_app() -> App {
    App::new(
        Arc::new(NoopClient),
        Box::new(MemoryHistory::new()),
        "test-model".to_string(),
    )
}
