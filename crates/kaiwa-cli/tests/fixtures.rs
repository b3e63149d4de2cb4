//! Gemini SSE fixture helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;

use wiremock::ResponseTemplate;

pub const SSE_TEXT: &str = include_str!("fixtures/sse_text_response.sse");
pub const SSE_ERROR: &str = include_str!("fixtures/sse_error_response.sse");

pub const API_KEY: &str = "test-api-key";
pub const STREAM_PATH: &str = "/v1beta/models/gemini-2.5-flash-lite:streamGenerateContent";

/// Base URL to point `GEMINI_BASE_URL` at.
pub fn base_url(server_uri: &str) -> String {
    format!("{server_uri}/v1beta")
}

/// Streams `text` as two SSE chunks, split mid-payload.
pub fn text_sse(text: &str) -> String {
    let split = text
        .char_indices()
        .nth(text.chars().count() / 2)
        .map_or(text.len(), |(idx, _)| idx);
    let (first, rest) = text.split_at(split);
    SSE_TEXT
        .replace("{{FIRST}}", &escape_json(first))
        .replace("{{REST}}", &escape_json(rest))
}

/// A mid-stream error event.
pub fn error_sse(code: u16, status: &str, message: &str) -> String {
    SSE_ERROR
        .replace("{{CODE}}", &code.to_string())
        .replace("{{STATUS}}", status)
        .replace("{{MESSAGE}}", &escape_json(message))
}

/// Wrap SSE body string in a ResponseTemplate.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// Convenience: text SSE wrapped in ResponseTemplate.
pub fn text_response(text: &str) -> ResponseTemplate {
    sse_response(&text_sse(text))
}

/// A free-mode reply payload.
pub fn free_reply(reply: &str) -> String {
    serde_json::json!({
        "reply": reply,
        "corrections": [],
        "new_vocabulary": [],
    })
    .to_string()
}

/// A scenario verdict payload.
pub fn verdict(passed: bool, reply: &str, partner_reply: &str) -> String {
    let corrections = if passed {
        serde_json::json!([])
    } else {
        serde_json::json!([{
            "original": "週末はひま？",
            "corrected": "今週の土曜日、暇？",
            "explanation": "原句說的是這禮拜六",
        }])
    };
    serde_json::json!({
        "passed": passed,
        "reply": reply,
        "suggested_translation": if passed { "今週の土曜日、暇？" } else { "" },
        "partner_reply": partner_reply,
        "corrections": corrections,
        "new_vocabulary": [],
    })
    .to_string()
}

/// Writes a three-line scenario (A, B, A) into `$KAIWA_HOME/scenarios`.
pub fn write_short_scenario(home: &Path) {
    let dir = home.join("scenarios");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("short.toml"),
        r#"id = "short"
title = "週末的約定"

[roles]
A = "友人A"
B = "友人B"

[[lines]]
speaker = "A"
text = "這禮拜六有空嗎？"

[[lines]]
speaker = "B"
text = "下午應該有空。"

[[lines]]
speaker = "A"
text = "那就當天見啦！"
"#,
    )
    .unwrap();
}

/// Escape special characters for JSON string embedding.
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
