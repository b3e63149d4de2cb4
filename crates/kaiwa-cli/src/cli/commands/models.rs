//! Models command handler.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use kaiwa_core::config::Config;
use kaiwa_core::providers::gemini::{GeminiClient, GeminiConfig};

pub async fn list(config: &Config) -> Result<()> {
    let client = GeminiClient::new(GeminiConfig::from_config(config)?);
    let models = client.list_models().await.context("list Gemini models")?;

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["", "Model", "Name", "Input", "Output"]);
    for model in &models {
        let active = if model.id() == config.model { "*" } else { "" };
        table.add_row(vec![
            active.to_string(),
            model.id().to_string(),
            model.display_name.clone().unwrap_or_default(),
            format_limit(model.input_token_limit),
            format_limit(model.output_token_limit),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn format_limit(limit: Option<u64>) -> String {
    limit.map_or_else(|| "-".to_string(), |n| n.to_string())
}
