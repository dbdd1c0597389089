//! Content-type classification for assistant replies.
//!
//! Maps raw reply text to a rendering mode. Keyword mentions win over
//! structure: a reply that *talks about* HTML renders as HTML even if its
//! body happens to be valid JSON. Exported conversations record the
//! classified type, so the precedence order is part of the file format.

use crate::chat::types::ContentType;

/// Classify text into a rendering mode. Pure and total.
///
/// Precedence: keyword mentions ("markdown"/"html"/"json", case-insensitive)
/// → JSON parse → markdown structure → HTML tag → plain text.
pub fn classify(text: &str) -> ContentType {
    let lower = text.to_lowercase();
    if lower.contains("markdown") {
        return ContentType::Markdown;
    }
    if lower.contains("html") {
        return ContentType::Html;
    }
    if lower.contains("json") {
        return ContentType::Json;
    }

    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        return ContentType::Json;
    }

    if has_markdown_structure(text) {
        return ContentType::Markdown;
    }

    if has_html_tag(text) {
        return ContentType::Html;
    }

    ContentType::Text
}

fn has_markdown_structure(text: &str) -> bool {
    delimited(text, "**")
        || delimited(text, "*")
        || delimited(text, "```")
        || has_link(text)
        || text
            .lines()
            .any(|line| is_heading(line) || is_list_item(line) || is_table_row(line))
}

/// `# ` at the start of a line (any whitespace after the hash).
fn is_heading(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace()))
}

/// `- `, `* `, or `+ ` after optional indentation.
fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    matches!(chars.next(), Some('-' | '*' | '+'))
        && chars.next().is_some_and(|c| c.is_whitespace())
}

/// `|cell|cell|` — three pipes with at least one char between each pair.
fn is_table_row(line: &str) -> bool {
    let Some(first) = line.find('|') else {
        return false;
    };
    let rest = &line[first + 1..];
    let Some(second) = rest
        .char_indices()
        .skip(1)
        .find_map(|(i, c)| (c == '|').then_some(i))
    else {
        return false;
    };
    rest[second + 1..].char_indices().skip(1).any(|(_, c)| c == '|')
}

/// A pair of `marker` occurrences with at least one char between them,
/// e.g. `**bold**` or a fenced code block.
fn delimited(text: &str, marker: &str) -> bool {
    let Some(open) = text.find(marker) else {
        return false;
    };
    let after = &text[open + marker.len()..];
    match after.char_indices().nth(1) {
        Some((i, _)) => after[i..].contains(marker),
        None => false,
    }
}

/// `[label](url)` with non-empty label and url.
fn has_link(text: &str) -> bool {
    let Some(mid) = text.find("](") else {
        return false;
    };
    if text[..mid].find('[').is_none_or(|open| mid - open < 2) {
        return false;
    }
    // At least one char of url before the closing paren
    text[mid + 2..].find(')').is_some_and(|close| close >= 1)
}

/// `<` followed by a letter, with a closing `>` somewhere after (may span lines).
fn has_html_tag(text: &str) -> bool {
    let bytes = text.as_bytes();
    for (i, pair) in bytes.windows(2).enumerate() {
        if pair[0] == b'<' && pair[1].is_ascii_alphabetic() {
            return bytes[i + 2..].contains(&b'>');
        }
    }
    false
}
