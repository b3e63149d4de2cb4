//! Scenario listing handlers.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use kaiwa_core::config::Config;
use kaiwa_types::Speaker;

use super::scenario::load_catalog;

pub fn list(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Roles", "Lines"]);
    for scenario in catalog.list() {
        table.add_row(vec![
            scenario.id.clone(),
            scenario.title.clone(),
            format!("A: {} / B: {}", scenario.roles.a, scenario.roles.b),
            format!(
                "{} (A {}, B {})",
                scenario.lines.len(),
                scenario.total_user_lines(Speaker::A),
                scenario.total_user_lines(Speaker::B)
            ),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn show(config: &Config, id: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let scenario = catalog.require(id)?;

    println!("{} ({})", scenario.title, scenario.id);
    if !scenario.description.trim().is_empty() {
        println!("{}", scenario.description.trim());
    }
    println!();
    println!("{}", scenario.script_text());
    Ok(())
}
