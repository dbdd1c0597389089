//! Local mock chat-completion server.
//!
//! Speaks just enough OpenAI wire format for the TUI client: canned replies
//! chosen by keywords in the last user message, streamed word by word over
//! SSE with artificial delays. A fixed seed makes output reproducible.

pub mod generate;
pub mod samples;
pub mod server;

pub use server::serve;

use serde::{Deserialize, Serialize};

/// Runtime-tunable server behavior. Field names are camelCase on the wire
/// to match the `/config` endpoint contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Fail ~10% of completion requests with a simulated server error.
    pub include_errors: bool,
    /// Delay before responding, in milliseconds.
    pub latency: u64,
    /// Log each completion request at info level.
    pub log_requests: bool,
    /// Seed for the response RNG. Changing it reseeds the generator.
    pub seed: u64,
    /// Always pick the first generic sample instead of a random one.
    pub use_fixed_responses: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            include_errors: false,
            latency: 100,
            log_requests: true,
            seed: 12345,
            use_fixed_responses: false,
        }
    }
}

/// Sparse config update from `POST /config`: only provided fields change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfigPatch {
    pub include_errors: Option<bool>,
    pub latency: Option<u64>,
    pub log_requests: Option<bool>,
    pub seed: Option<u64>,
    pub use_fixed_responses: Option<bool>,
}

impl MockConfig {
    /// Merge a patch into the config. Returns true when the seed changed,
    /// signaling the caller to reseed the RNG.
    pub fn apply(&mut self, patch: MockConfigPatch) -> bool {
        if let Some(v) = patch.include_errors {
            self.include_errors = v;
        }
        if let Some(v) = patch.latency {
            self.latency = v;
        }
        if let Some(v) = patch.log_requests {
            self.log_requests = v;
        }
        if let Some(v) = patch.use_fixed_responses {
            self.use_fixed_responses = v;
        }
        match patch.seed {
            Some(seed) if seed != self.seed => {
                self.seed = seed;
                true
            }
            _ => false,
        }
    }
}
