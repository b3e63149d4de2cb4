//! Incremental structured-response parser.
//!
//! The model streams one JSON document token by token. While it is still
//! incomplete we want something readable on screen, so `parse_response`
//! degrades gracefully:
//!
//! 1. strip ```` ```json ```` fences and trim
//! 2. full parse, then a retry on the outermost `{ ... }` span
//! 3. partial extraction of the `"reply"` string value
//! 4. a placeholder while nothing readable has arrived yet
//!
//! Parsing is pure and recomputes from scratch on every call. Only a full
//! parse ever yields a structured value; partial extraction is display-only.

use std::sync::OnceLock;

use kaiwa_types::{Correction, ScenarioFeedback, StructuredFeedback, VocabEntry};
use regex::Regex;
use serde::de::DeserializeOwned;

/// Display text shown while the reply field has not started streaming.
pub const COMPOSING_PLACEHOLDER: &str = "...";

const FENCE_MARKER: &str = "```";

/// A payload type the parser can produce.
pub trait ReplyPayload: DeserializeOwned {
    /// The human-facing reply text.
    fn reply(&self) -> &str;
    fn corrections(&self) -> &[Correction];
    fn new_vocabulary(&self) -> &[VocabEntry];

    /// Whether this payload is a passing verdict, whose content is folded
    /// into history instead of being shown as its own bubble.
    fn is_pass(&self) -> bool {
        false
    }
}

impl ReplyPayload for StructuredFeedback {
    fn reply(&self) -> &str {
        &self.reply
    }

    fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    fn new_vocabulary(&self) -> &[VocabEntry] {
        &self.new_vocabulary
    }
}

impl ReplyPayload for ScenarioFeedback {
    fn reply(&self) -> &str {
        &self.reply
    }

    fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    fn new_vocabulary(&self) -> &[VocabEntry] {
        &self.new_vocabulary
    }

    fn is_pass(&self) -> bool {
        self.passed
    }
}

/// Result of parsing a (possibly incomplete) buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse<T> {
    /// Present only when the whole buffer parsed into `T`.
    pub structured: Option<T>,
    pub display_text: String,
}

/// Parses a streamed buffer into a best-effort structured value and display text.
pub fn parse_response<T: ReplyPayload>(buffer: &str) -> ParsedResponse<T> {
    let cleaned = strip_fences(buffer);

    if let Some(value) = parse_full::<T>(&cleaned) {
        let display_text = value.reply().to_string();
        return ParsedResponse {
            structured: Some(value),
            display_text,
        };
    }

    let looks_structured =
        buffer.trim_start().starts_with(FENCE_MARKER) || cleaned.starts_with('{');
    if !looks_structured {
        return ParsedResponse {
            structured: None,
            display_text: buffer.to_string(),
        };
    }

    let display_text = match extract_partial_reply(&cleaned) {
        Some(fragment) if !fragment.is_empty() => unescape_fragment(fragment),
        _ => COMPOSING_PLACEHOLDER.to_string(),
    };
    ParsedResponse {
        structured: None,
        display_text,
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"```json\n?|```").ok())
        .as_ref()
}

fn reply_key_regex() -> Option<&'static Regex> {
    static REPLY_KEY: OnceLock<Option<Regex>> = OnceLock::new();
    REPLY_KEY
        .get_or_init(|| Regex::new(r#""reply"\s*:\s*""#).ok())
        .as_ref()
}

fn strip_fences(buffer: &str) -> String {
    match fence_regex() {
        Some(re) => re.replace_all(buffer, "").trim().to_string(),
        None => buffer.trim().to_string(),
    }
}

fn parse_full<T: DeserializeOwned>(cleaned: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(cleaned) {
        return Some(value);
    }

    // Tolerate leading/trailing noise around a complete object.
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start || (start == 0 && end + 1 == cleaned.len()) {
        return None;
    }
    serde_json::from_str::<T>(&cleaned[start..=end]).ok()
}

/// Returns the raw (still escaped) characters of the `reply` string value,
/// up to the next unescaped quote or the end of the buffer.
fn extract_partial_reply(cleaned: &str) -> Option<&str> {
    let key = reply_key_regex()?.find(cleaned)?;
    let rest = &cleaned[key.end()..];

    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(&rest[..idx]),
            _ => {}
        }
    }
    Some(rest)
}

fn unescape_fragment(fragment: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{fragment}\"")).unwrap_or_else(|_| {
        // Truncated mid-escape: handle the common escapes by hand.
        fragment
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\"", "\"")
    })
}
