//! System prompts for the practice modes.

use anyhow::{Context, Result};
use kaiwa_types::{PracticeRequest, RequestKind, Speaker};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Free-conversation tutor prompt.
pub const FREE_MODE_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/free_mode.md"
));

/// Scenario translation-drill prompt (`MiniJinja`).
pub const SCENARIO_MODE_PROMPT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/scenario_mode.md"
));

#[derive(Debug, Serialize)]
struct ScenarioPromptVars<'a> {
    user_role: Option<&'a str>,
    current_line: Option<&'a str>,
    partner_next_line: Option<&'a str>,
    scenario_context: Option<&'a str>,
}

/// Builds the system instruction for a request, chosen by its kind.
///
/// # Errors
/// Returns an error if the scenario template fails to render.
pub fn render_system_prompt(request: &PracticeRequest) -> Result<String> {
    match request.kind() {
        RequestKind::Free => Ok(FREE_MODE_PROMPT.trim().to_string()),
        RequestKind::Scenario => {
            let vars = ScenarioPromptVars {
                user_role: request.user_role.map(Speaker::as_str),
                current_line: non_empty(request.current_line.as_deref()),
                partner_next_line: non_empty(request.partner_next_line.as_deref()),
                scenario_context: non_empty(request.scenario_context.as_deref()),
            };
            render_template(SCENARIO_MODE_PROMPT_TEMPLATE, &vars)
                .context("Failed to render scenario prompt")
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn render_template(template: &str, vars: &impl Serialize) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template("system_prompt", template)?;

    let output = env.get_template("system_prompt")?.render(vars)?;

    let normalized = output.replace("\r\n", "\n");
    Ok(collapse_blank_lines(normalized.trim()))
}

/// Conditional blocks leave runs of empty lines behind; keep at most one.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
