//! Gemini request building helpers.

use kaiwa_types::{Message, Role};
use serde_json::{Value, json};

use crate::providers::{ProviderError, ProviderErrorKind};

/// Classifies a reqwest error into a `ProviderError`.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

/// Builds the Gemini `contents` array. Assistant turns use the `model` role.
pub fn build_contents(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|message| !message.text.trim().is_empty())
        .map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({
                "role": role,
                "parts": [{ "text": message.text }]
            })
        })
        .collect()
}

/// Options shaping the `generationConfig` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    /// Ask for `application/json` output.
    pub json_output: bool,
}

/// Builds a `streamGenerateContent` request body.
pub fn build_gemini_request(messages: &[Message], system: &str, options: GenerationOptions) -> Value {
    let mut request = json!({
        "contents": build_contents(messages),
    });

    if !system.trim().is_empty() {
        request["systemInstruction"] = json!({
            "parts": [{ "text": system }]
        });
    }

    let mut generation_config = json!({});
    if let Some(max) = options.max_output_tokens
        && max > 0
    {
        generation_config["maxOutputTokens"] = json!(max);
    }
    if options.json_output {
        generation_config["responseMimeType"] = json!("application/json");
    }

    // Only add generationConfig if it has content
    if generation_config.as_object().is_some_and(|o| !o.is_empty()) {
        request["generationConfig"] = generation_config;
    }

    request
}
