//! Chat command handler.

use anyhow::{Context, Result};
use kaiwa_core::config::Config;
use kaiwa_core::practice::PracticeSession;
use kaiwa_core::providers::gemini::{GeminiClient, GeminiConfig};

use crate::modes::repl::{self, ReplSetup};

pub async fn run(config: &Config) -> Result<()> {
    let client = GeminiClient::new(GeminiConfig::from_config(config)?);
    let catalog = super::scenario::load_catalog(config)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    repl::run(
        stdin.lock(),
        &mut stdout,
        &client,
        ReplSetup {
            catalog,
            session: PracticeSession::free(),
            scenario: None,
        },
    )
    .await
    .context("interactive chat failed")
}
