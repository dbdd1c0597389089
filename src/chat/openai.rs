//! HTTP client for an OpenAI-style chat-completion server.
//!
//! Speaks `POST /v1/chat/completions` with `stream: true` and consumes the
//! SSE response frame by frame, forwarding content deltas to the caller's
//! channel. Also probes `GET /health` for the connection indicator.

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;

use crate::chat::client::{ChatClient, ChatRequest, ClientError};
use crate::chat::types::StreamEvent;
use crate::chat::wire::{CompletionChunk, CompletionRequest, DONE_FRAME, WireMessage};

/// Client against an OpenAI-compatible server (the bundled mock, or any
/// other server speaking the same wire format).
pub struct OpenAiClient {
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// `base_url` is the server root (no trailing `/v1`), e.g.
    /// `http://localhost:8080`. Falls back to `PARROT_SERVER_URL`, then
    /// the default local mock address.
    pub fn new(base_url: Option<String>) -> Self {
        let env_url = std::env::var("PARROT_SERVER_URL").ok();
        let final_url = base_url
            .or(env_url)
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        Self {
            base_url: final_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(
        &self,
        request: ChatRequest<'_>,
        sender: Sender<StreamEvent>,
    ) -> Result<(), ClientError> {
        let body = CompletionRequest {
            model: request.model.to_string(),
            messages: request.history.iter().map(WireMessage::from).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        info!(
            "Chat completion request: model={}, messages={}",
            body.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Server error: {} - {}", status, err_body);
            return Err(ClientError::Api {
                status,
                message: err_body,
            });
        }

        // Process the SSE stream line by line
        let mut buffer = String::new();
        let mut total_content_len = 0usize;
        let mut chunk_count = 0usize;
        let mut response = response;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?
        {
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete lines from buffer
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].to_string();
                buffer.drain(..pos + 1);
                let line = line.trim();

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };

                if data == DONE_FRAME {
                    info!(
                        "Stream complete: {} chunks, {} content bytes",
                        chunk_count, total_content_len
                    );
                    if sender.send(StreamEvent::Done).await.is_err() {
                        warn!("Done event send failed: receiver dropped");
                        return Err(ClientError::ChannelClosed);
                    }
                    return Ok(());
                }

                let frame: CompletionChunk = match serde_json::from_str(data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // Skip unparseable frames rather than killing the stream
                        debug!("Skipping malformed SSE frame: {} ({})", data, e);
                        continue;
                    }
                };

                for choice in frame.choices {
                    if let Some(text) = choice.delta.content
                        && !text.is_empty()
                    {
                        chunk_count += 1;
                        total_content_len += text.len();
                        if sender.send(StreamEvent::Delta(text)).await.is_err() {
                            warn!("Delta send failed: receiver dropped");
                            return Err(ClientError::ChannelClosed);
                        }
                    }
                }
            }
        }

        // Stream ended without a [DONE] frame — treat as complete anyway
        info!(
            "Stream ended without DONE: {} chunks, {} content bytes",
            chunk_count, total_content_len
        );
        if sender.send(StreamEvent::Done).await.is_err() {
            return Err(ClientError::ChannelClosed);
        }
        Ok(())
    }

    async fn healthy(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}
