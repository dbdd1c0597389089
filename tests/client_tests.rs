use parrot::chat::client::{ChatClient, ChatRequest, ClientError};
use parrot::chat::openai::OpenAiClient;
use parrot::chat::types::{Message, StreamEvent};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn test_history() -> Vec<Message> {
    vec![Message::user("Hello".to_string())]
}

fn test_request<'a>(history: &'a [Message]) -> ChatRequest<'a> {
    ChatRequest {
        history,
        model: "test-model",
        max_tokens: 256,
        temperature: 0.7,
    }
}

/// Collects all stream events, returning the deltas and whether Done arrived.
async fn collect_events(mut receiver: mpsc::Receiver<StreamEvent>) -> (Vec<String>, bool) {
    let mut deltas = Vec::new();
    let mut done = false;

    while let Some(event) = receiver.recv().await {
        match event {
            StreamEvent::Delta(text) => deltas.push(text),
            StreamEvent::Done => done = true,
        }
    }

    (deltas, done)
}

fn sse_frame(content: &str) -> String {
    format!(
        "data: {{\"id\":\"chatcmpl-test\",\"object\":\"chat.completion.chunk\",\"created\":1700000000,\"model\":\"test-model\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n\n",
        serde_json::to_string(content).unwrap()
    )
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_successful_streaming() {
    let mock_server = MockServer::start().await;

    let mut sse_response = String::new();
    sse_response.push_str(&sse_frame("Hello"));
    sse_response.push_str(&sse_frame(" world"));
    sse_response.push_str("data: [DONE]\n\n");

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_response, "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;

    assert!(result.is_ok());

    let (deltas, done) = collect_events(rx).await;
    assert_eq!(deltas, vec!["Hello", " world"]);
    assert!(done);
}

#[tokio::test]
async fn test_request_body_carries_history_and_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "max_tokens": 256,
            "stream": true,
            "messages": [{"role": "user", "content": "Hello"}],
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("data: [DONE]\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;
    assert!(result.is_ok());

    let (deltas, done) = collect_events(rx).await;
    assert!(deltas.is_empty());
    assert!(done);
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let mock_server = MockServer::start().await;

    let mut sse_response = String::new();
    sse_response.push_str("data: {not json}\n\n");
    sse_response.push_str(&sse_frame("ok"));
    sse_response.push_str(": keep-alive comment\n\n");
    sse_response.push_str("data: [DONE]\n\n");

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_response, "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;
    assert!(result.is_ok());

    let (deltas, done) = collect_events(rx).await;
    assert_eq!(deltas, vec!["ok"]);
    assert!(done);
}

#[tokio::test]
async fn test_stream_without_done_frame_completes() {
    let mock_server = MockServer::start().await;

    // Body ends after the deltas without a [DONE] frame
    let sse_response = format!("{}{}", sse_frame("partial"), sse_frame(" reply"));

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_response, "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;
    assert!(result.is_ok());

    let (deltas, done) = collect_events(rx).await;
    assert_eq!(deltas, vec!["partial", " reply"]);
    assert!(done);
}

// ============================================================================
// Error Tests
// ============================================================================

#[tokio::test]
async fn test_server_error_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, _rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;

    assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Port 1 is never listening
    let client = OpenAiClient::new(Some("http://127.0.0.1:1".to_string()));
    let history = test_history();

    let (tx, _rx) = mpsc::channel(100);
    let result = client.stream_chat(test_request(&history), tx).await;

    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_channel_closed_error() {
    let mock_server = MockServer::start().await;

    let sse_response = format!("{}{}", sse_frame("Hello"), sse_frame(" world"));

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_response, "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    let history = test_history();

    let (tx, rx) = mpsc::channel(1);
    // Drop receiver immediately to simulate the UI going away
    drop(rx);

    let result = client.stream_chat(test_request(&history), tx).await;

    assert!(matches!(result, Err(ClientError::ChannelClosed)));
}

// ============================================================================
// Health Probe Tests
// ============================================================================

#[tokio::test]
async fn test_healthy_when_health_endpoint_responds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
        .mount(&mock_server)
        .await;

    let client = OpenAiClient::new(Some(mock_server.uri()));
    assert!(client.healthy().await);
}

#[tokio::test]
async fn test_unhealthy_when_unreachable() {
    let client = OpenAiClient::new(Some("http://127.0.0.1:1".to_string()));
    assert!(!client.healthy().await);
}
