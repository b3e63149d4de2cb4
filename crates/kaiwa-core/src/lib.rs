//! Core kaiwa library (practice engine, providers, config).

pub mod config;
pub mod logging;
pub mod practice;
pub mod prompts;
pub mod providers;
pub mod scenarios;
