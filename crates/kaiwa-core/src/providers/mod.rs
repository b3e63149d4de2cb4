//! Model transports.

pub mod gemini;
pub mod shared;

pub use shared::{
    ProviderError, ProviderErrorKind, ProviderResult, ProviderStream, StreamEvent, USER_AGENT,
    failure_text, resolve_api_key, resolve_base_url,
};
