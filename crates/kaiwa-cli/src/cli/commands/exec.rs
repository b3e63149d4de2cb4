//! Exec command handler.

use anyhow::{Context, Result};
use kaiwa_core::config::Config;
use kaiwa_core::providers::gemini::{GeminiClient, GeminiConfig};

use crate::modes;

pub async fn run(config: &Config, prompt: &str, json: bool) -> Result<()> {
    let client = GeminiClient::new(GeminiConfig::from_config(config)?);
    let mut stdout = std::io::stdout();
    modes::exec::run_exec(&mut stdout, &client, prompt, json)
        .await
        .context("execute prompt")
}
