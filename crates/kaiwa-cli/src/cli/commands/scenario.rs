//! Scenario command handler.

use anyhow::{Context, Result};
use kaiwa_core::config::Config;
use kaiwa_core::practice::PracticeSession;
use kaiwa_core::providers::gemini::{GeminiClient, GeminiConfig};
use kaiwa_core::scenarios::ScenarioCatalog;
use kaiwa_types::Speaker;

use crate::modes::repl::{self, ActiveScenario, ReplSetup};

pub async fn run(config: &Config, id: Option<&str>, role: Speaker) -> Result<()> {
    let catalog = load_catalog(config)?;
    let scenario = match id {
        Some(id) => catalog.require(id)?,
        None => catalog
            .default_scenario()
            .context("No scenarios available")?,
    }
    .clone();
    let client = GeminiClient::new(GeminiConfig::from_config(config)?);

    let active = ActiveScenario {
        id: scenario.id.clone(),
        role,
    };
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    repl::run(
        stdin.lock(),
        &mut stdout,
        &client,
        ReplSetup {
            catalog,
            session: PracticeSession::scenario(scenario, role),
            scenario: Some(active),
        },
    )
    .await
    .context("scenario practice failed")
}

/// Loads the scenario catalog, reporting skipped files on stderr.
pub fn load_catalog(config: &Config) -> Result<ScenarioCatalog> {
    let catalog = ScenarioCatalog::load(&config.scenarios_dir())?;
    for warning in catalog.warnings() {
        eprintln!(
            "Warning: skipped scenario {}: {}",
            warning.path.display(),
            warning.message
        );
    }
    Ok(catalog)
}
