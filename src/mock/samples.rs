//! Canned reply content, keyed by keywords in the last user message.

use rand::Rng;
use rand::rngs::StdRng;

pub const MARKDOWN_SAMPLE: &str = "# Markdown Sample\n\nHere's a demonstration of **markdown** rendering:\n\n## Features\n\n- Headings and *emphasis*\n- Bullet lists like this one\n- [Links](https://example.com)\n- Inline `code`\n\n```rust\nfn main() {\n    println!(\"fenced code blocks too\");\n}\n```\n\n| Feature | Supported |\n|---------|-----------|\n| Tables  | yes       |\n| Images  | no        |";

pub const HTML_SAMPLE: &str = "<div class=\"sample\">\n  <h2>HTML Sample</h2>\n  <p>This reply contains <strong>HTML</strong> markup.</p>\n  <ul>\n    <li>An unordered list</li>\n    <li>With a couple of items</li>\n  </ul>\n</div>";

pub const JSON_SAMPLE: &str = "{\n  \"name\": \"sample response\",\n  \"format\": \"JSON\",\n  \"fields\": {\n    \"nested\": true,\n    \"count\": 3\n  },\n  \"tags\": [\"alpha\", \"beta\", \"gamma\"]\n}";

pub const GENERIC_SAMPLES: &[&str] = &[
    "That's an interesting question. Let me think through it step by step. \
     The short answer is that it depends on the context, but in most cases \
     the straightforward approach works best.",
    "Thanks for asking! Here's what I know about that topic. There are a few \
     different angles to consider, and the trade-offs between them matter \
     more than any single right answer.",
    "Good question. Broadly speaking there are two common approaches, and \
     which one fits depends on your constraints. I'd start with the simpler \
     one and only reach for the other if you hit its limits.",
    "I can help with that. The key thing to understand first is the overall \
     structure of the problem; once that's clear, the individual steps \
     mostly fall into place on their own.",
];

/// Pick reply content for the given last-user-message text. Keyword matches
/// are deterministic; generic replies draw from the RNG unless fixed
/// responses are configured.
pub fn pick_sample<'a>(last_user: &str, use_fixed: bool, rng: &mut StdRng) -> &'a str {
    let lower = last_user.to_lowercase();
    if lower.contains("markdown") {
        return MARKDOWN_SAMPLE;
    }
    if lower.contains("html") {
        return HTML_SAMPLE;
    }
    if lower.contains("json") {
        return JSON_SAMPLE;
    }
    if use_fixed {
        GENERIC_SAMPLES[0]
    } else {
        GENERIC_SAMPLES[rng.gen_range(0..GENERIC_SAMPLES.len())]
    }
}
