//! Gemini provider helpers and client.

pub mod api;
pub mod shared;
mod sse;

pub use api::{DEFAULT_BASE_URL, GeminiClient, GeminiConfig, ModelInfo};
