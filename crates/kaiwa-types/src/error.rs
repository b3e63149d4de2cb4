//! Transport error contract.
//!
//! Both request kinds report failures as a non-stream JSON body
//! `{ "error": "RATE_LIMIT" }` (429) or `{ "error": "SERVER_ERROR" }` (500).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimit,
    ServerError,
}

impl ErrorCode {
    /// Classifies an underlying failure by its message text.
    ///
    /// Anything mentioning `429`, `quota`, or `RESOURCE_EXHAUSTED` is a rate
    /// limit; everything else is a server error.
    pub fn classify(message: &str) -> Self {
        const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "quota", "RESOURCE_EXHAUSTED"];
        if RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            ErrorCode::RateLimit
        } else {
            ErrorCode::ServerError
        }
    }

    pub fn status(self) -> u16 {
        match self {
            ErrorCode::RateLimit => 429,
            ErrorCode::ServerError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServerError => "SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ErrorCode,
}

impl ApiErrorBody {
    pub fn from_failure(message: &str) -> Self {
        Self {
            error: ErrorCode::classify(message),
        }
    }

    pub fn status(&self) -> u16 {
        self.error.status()
    }
}
