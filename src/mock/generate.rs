//! Response generation for the mock server.
//!
//! Builds OpenAI-shaped completion objects and streamed chunk frames from
//! canned sample content. All randomness flows through the caller's seeded
//! RNG so identical configuration reproduces identical output.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;

use crate::chat::wire::{
    Choice, Completion, CompletionChunk, CompletionRequest, ChunkChoice, Delta, Usage,
    WireMessage,
};
use crate::mock::MockConfig;
use crate::mock::samples::pick_sample;

/// Generate an OpenAI-style completion id: `chatcmpl-` + 28 alphanumerics.
pub fn completion_id(rng: &mut StdRng) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(28)
        .map(char::from)
        .collect();
    format!("chatcmpl-{suffix}")
}

fn last_user_content(request: &CompletionRequest) -> &str {
    request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Build a non-streaming completion response.
pub fn completion(request: &CompletionRequest, config: &MockConfig, rng: &mut StdRng) -> Completion {
    let content = pick_sample(last_user_content(request), config.use_fixed_responses, rng);
    let prompt_tokens = rng.gen_range(10..=100);
    let completion_tokens = rng.gen_range(20..=200);
    let total_tokens = rng.gen_range(30..=300);

    Completion {
        id: completion_id(rng),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: request.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: WireMessage {
                role: "assistant".to_string(),
                content: content.to_string(),
            },
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        },
    }
}

/// Build the full streamed frame sequence for a request: one role frame,
/// one frame per word (each trailed by a space), then an empty-delta stop
/// frame. Each frame carries the delay to wait before sending it.
pub fn chunk_frames(
    request: &CompletionRequest,
    config: &MockConfig,
    rng: &mut StdRng,
) -> Vec<(CompletionChunk, Duration)> {
    let content = pick_sample(last_user_content(request), config.use_fixed_responses, rng);
    let id = completion_id(rng);
    let created = Utc::now().timestamp();

    let frame = |delta: Delta, finish_reason: Option<String>| CompletionChunk {
        id: id.clone(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: request.model.clone(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    };

    let mut frames = Vec::new();

    frames.push((
        frame(
            Delta {
                role: Some("assistant".to_string()),
                content: None,
            },
            None,
        ),
        Duration::ZERO,
    ));

    for word in content.split(' ') {
        let delay = Duration::from_millis(rng.gen_range(10..=100));
        frames.push((
            frame(
                Delta {
                    role: None,
                    content: Some(format!("{word} ")),
                },
                None,
            ),
            delay,
        ));
    }

    frames.push((frame(Delta::default(), Some("stop".to_string())), Duration::ZERO));
    frames
}
