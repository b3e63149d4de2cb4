//! Scenario catalog.
//!
//! Built-in scripts are embedded at compile time. Extra scripts are read from
//! `*.toml` files in the scenarios directory; a file whose id matches a
//! built-in replaces it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use kaiwa_types::{Scenario, Speaker};
use tracing::{debug, warn};

const BUILTIN_SCENARIOS: &[&str] = &[include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/scenarios/weekend-plan.toml"
))];

/// A scenario file that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioWarning {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
    warnings: Vec<ScenarioWarning>,
}

impl ScenarioCatalog {
    /// Catalog with only the embedded scenarios.
    ///
    /// # Errors
    /// Returns an error if an embedded scenario fails to parse or validate.
    pub fn builtin() -> Result<Self> {
        let scenarios = BUILTIN_SCENARIOS
            .iter()
            .map(|source| parse_scenario(source))
            .collect::<Result<Vec<_>>>()
            .context("Invalid built-in scenario")?;
        Ok(Self {
            scenarios,
            warnings: Vec::new(),
        })
    }

    /// Built-in scenarios merged with the files in `dir`.
    ///
    /// A missing directory is not an error. Unreadable or invalid files are
    /// skipped and reported through [`ScenarioCatalog::warnings`].
    ///
    /// # Errors
    /// Returns an error if an embedded scenario is invalid.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut catalog = Self::builtin()?;
        for path in scenario_files(dir) {
            match load_scenario_file(&path) {
                Ok(scenario) => catalog.insert(scenario),
                Err(err) => {
                    warn!(path = %path.display(), "Skipping scenario: {err:#}");
                    catalog.warnings.push(ScenarioWarning {
                        path,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        Ok(catalog)
    }

    fn insert(&mut self, scenario: Scenario) {
        if let Some(existing) = self.scenarios.iter_mut().find(|s| s.id == scenario.id) {
            debug!(id = %scenario.id, "User scenario replaces built-in");
            *existing = scenario;
        } else {
            self.scenarios.push(scenario);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Looks up a scenario, listing the known ids when it is missing.
    ///
    /// # Errors
    /// Returns an error if no scenario has the given id.
    pub fn require(&self, id: &str) -> Result<&Scenario> {
        self.get(id).with_context(|| {
            let known: Vec<&str> = self.scenarios.iter().map(|s| s.id.as_str()).collect();
            format!("Unknown scenario: {id} (available: {})", known.join(", "))
        })
    }

    /// The first scenario in the catalog, used when none is named.
    pub fn default_scenario(&self) -> Option<&Scenario> {
        self.scenarios.first()
    }

    pub fn list(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn warnings(&self) -> &[ScenarioWarning] {
        &self.warnings
    }
}

/// Rejects scripts the turn machine cannot drive.
///
/// # Errors
/// Returns an error naming the first problem found.
pub fn validate(scenario: &Scenario) -> Result<()> {
    if scenario.id.trim().is_empty() {
        bail!("Scenario id cannot be empty");
    }
    if scenario.lines.is_empty() {
        bail!("Scenario {} has no lines", scenario.id);
    }
    for speaker in [Speaker::A, Speaker::B] {
        if scenario.total_user_lines(speaker) == 0 {
            bail!(
                "Scenario {} has no lines for role {speaker} ({})",
                scenario.id,
                scenario.role_name(speaker)
            );
        }
    }
    if let Some(index) = scenario.lines.iter().position(|l| l.text.trim().is_empty()) {
        bail!("Scenario {} line {} is empty", scenario.id, index + 1);
    }
    Ok(())
}

fn parse_scenario(source: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(source).context("Failed to parse scenario")?;
    validate(&scenario)?;
    Ok(scenario)
}

fn load_scenario_file(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    parse_scenario(&contents)
}

fn scenario_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if dir.exists() {
                warn!(dir = %dir.display(), "Failed to read scenarios directory: {err}");
            }
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(std::ffi::OsStr::to_str)
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
        })
        .collect();
    files.sort();
    files
}
