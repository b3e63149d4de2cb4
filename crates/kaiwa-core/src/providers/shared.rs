//! Provider-agnostic types shared by model transports.

use std::fmt;

use anyhow::{Context, Result};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard User-Agent header for kaiwa API requests.
pub const USER_AGENT: &str = concat!("kaiwa/", env!("CARGO_PKG_VERSION"));

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Returns an error if neither source provides a key.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .with_context(|| {
            format!("No API key available. Set {env_var} or api_key in [providers.{config_section}].")
        })
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL is malformed.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} base URL: {url}"))?;
    Ok(())
}

/// Categories of provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Failed to parse the response (invalid SSE, JSON, etc.)
    Parse,
    /// Error reported by the API inside the stream
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the provider with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw error body, when there is one
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, lifting `error.message` out of a JSON body.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(ProviderErrorKind::HttpStatus, format!("HTTP {status}"));
        }
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
                    .map(|msg| format!("HTTP {status}: {msg}"))
            })
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self {
            kind: ProviderErrorKind::HttpStatus,
            message,
            details: Some(body.to_string()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    /// Creates an API error (from a mid-stream error event).
    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self::new(
            ProviderErrorKind::ApiError,
            format!("{error_type}: {message}"),
        )
    }

    /// Message plus details, for classification against the error contract.
    pub fn full_text(&self) -> String {
        match &self.details {
            Some(details) => format!("{} {details}", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Text used to classify a failed request (includes provider error details).
pub fn failure_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ProviderError>() {
        Some(provider) => provider.full_text(),
        None => format!("{err:#}"),
    }
}

/// Events emitted while a response streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Newly arrived response text
    TextDelta { text: String },
    /// The response finished
    Completed { finish_reason: Option<String> },
    /// Error event from the API
    Error { error_type: String, message: String },
}

/// Boxed stream of provider events.
pub type ProviderStream = BoxStream<'static, ProviderResult<StreamEvent>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_extracts_json_error_message() {
        let err = ProviderError::http_status(
            429,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 429: Quota exceeded");
        assert!(err.full_text().contains("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn http_status_keeps_plain_body_as_details() {
        let err = ProviderError::http_status(500, "upstream exploded");
        assert_eq!(err.message, "HTTP 500");
        assert_eq!(err.details.as_deref(), Some("upstream exploded"));
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn config_api_key_wins_over_env() {
        let key = resolve_api_key(Some("  from-config "), "KAIWA_TEST_UNSET_KEY", "gemini").unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn missing_api_key_names_env_var() {
        let err = resolve_api_key(None, "KAIWA_TEST_UNSET_KEY", "gemini").unwrap_err();
        assert!(err.to_string().contains("KAIWA_TEST_UNSET_KEY"));
    }

    #[test]
    fn base_url_from_config_is_validated() {
        let url = resolve_base_url(
            Some("http://localhost:8080/v1beta/"),
            "KAIWA_TEST_UNSET_URL",
            "https://default",
            "Gemini",
        )
        .unwrap();
        assert_eq!(url, "http://localhost:8080/v1beta");

        assert!(
            resolve_base_url(Some("not a url"), "KAIWA_TEST_UNSET_URL", "https://d", "Gemini")
                .is_err()
        );
        assert_eq!(
            resolve_base_url(None, "KAIWA_TEST_UNSET_URL", "https://d", "Gemini").unwrap(),
            "https://d"
        );
    }
}
