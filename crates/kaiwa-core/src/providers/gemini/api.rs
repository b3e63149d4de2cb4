//! Gemini API key client (Generative Language API).

use anyhow::{Context, Result};
use futures_util::StreamExt;
use kaiwa_types::PracticeRequest;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use super::shared::{GenerationOptions, build_gemini_request, classify_reqwest_error};
use super::sse::GeminiSseParser;
use crate::config::Config;
use crate::prompts::render_system_prompt;
use crate::providers::shared::{USER_AGENT, resolve_api_key, resolve_base_url};
use crate::providers::{ProviderError, ProviderStream};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: Option<u32>,
    pub json_output: bool,
}

impl GeminiConfig {
    /// Creates a config from the loaded settings and the environment.
    ///
    /// Environment variables:
    /// - `GEMINI_API_KEY` (fallback if not in config)
    /// - `GEMINI_BASE_URL` (overrides config)
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gemini = &config.providers.gemini;
        let api_key = resolve_api_key(gemini.effective_api_key(), "GEMINI_API_KEY", "gemini")?;
        let base_url = resolve_base_url(
            gemini.effective_base_url(),
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            json_output: config.json_output,
        })
    }
}

/// A model entry returned by `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub input_token_limit: Option<u64>,
    #[serde(default)]
    pub output_token_limit: Option<u64>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Model id without the `models/` prefix.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Starts streaming the reply to a practice request.
    ///
    /// The system prompt is chosen by the request kind.
    ///
    /// # Errors
    /// Returns an error if the prompt cannot be rendered or the request fails.
    pub async fn stream_practice(&self, request: &PracticeRequest) -> Result<ProviderStream> {
        let system = render_system_prompt(request)?;
        let body = build_gemini_request(
            &request.messages,
            &system,
            GenerationOptions {
                max_output_tokens: self.config.max_output_tokens,
                json_output: self.config.json_output,
            },
        );
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        );
        debug!(model = %self.config.model, kind = ?request.kind(), "Gemini stream request");

        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body).into());
        }

        Ok(GeminiSseParser::new(response.bytes_stream()).boxed())
    }

    /// Lists models that support content generation.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models?pageSize=1000", self.config.base_url);
        let mut headers = build_headers(&self.config.api_key);
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }

        let list: ModelList = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Gemini models response: {body}"))?;
        Ok(list
            .models
            .into_iter()
            .filter(|model| {
                model.supported_generation_methods.is_empty()
                    || model
                        .supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
            })
            .collect())
    }
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("text/event-stream"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_parses_and_strips_prefix() {
        let list: ModelList = serde_json::from_str(
            r#"{"models":[{"name":"models/gemini-2.5-flash-lite","displayName":"Gemini 2.5 Flash-Lite","inputTokenLimit":1048576,"outputTokenLimit":65536,"supportedGenerationMethods":["generateContent","countTokens"]}]}"#,
        )
        .unwrap();
        let model = &list.models[0];
        assert_eq!(model.id(), "gemini-2.5-flash-lite");
        assert_eq!(model.display_name.as_deref(), Some("Gemini 2.5 Flash-Lite"));
        assert_eq!(model.output_token_limit, Some(65536));
    }

    #[test]
    fn config_from_settings_prefers_config_key() {
        let mut config = Config::default();
        config.providers.gemini.api_key = Some("config-key".to_string());
        config.providers.gemini.base_url = Some("http://127.0.0.1:9".to_string());
        let gemini = GeminiConfig::from_config(&config).unwrap();
        assert_eq!(gemini.api_key, "config-key");
        assert_eq!(gemini.model, Config::default().model);
        assert!(gemini.json_output);
    }
}
