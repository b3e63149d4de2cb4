//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use kaiwa_core::config::{self, paths};
use kaiwa_core::logging;
use kaiwa_types::Speaker;

mod commands;

#[derive(Parser)]
#[command(name = "kaiwa")]
#[command(version)]
#[command(about = "Japanese conversation practice with a Gemini tutor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the model from config
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Free conversation with the tutor (default)
    Chat,
    /// Translate a scripted dialogue line by line
    Scenario {
        /// Scenario id (defaults to the first scenario)
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// Role to practice (A or B)
        #[arg(long, default_value = "A")]
        role: Speaker,
    },
    /// Browse available scenarios
    Scenarios {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
    /// Sends one free-mode message and prints the reply
    Exec {
        /// The message to send
        #[arg(short, long)]
        prompt: String,

        /// Print the structured reply as JSON
        #[arg(long)]
        json: bool,
    },
    /// List models available to the configured key
    Models,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ScenarioCommands {
    /// Lists scenarios
    List,
    /// Shows the script of a scenario
    Show {
        /// The ID of the scenario to show
        #[arg(value_name = "SCENARIO_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = config::Config::load().context("load config")?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    let _log_guard = match logging::init(&paths::logs_dir(), &config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    let Some(command) = cli.command else {
        return commands::chat::run(&config).await;
    };

    match command {
        Commands::Chat => commands::chat::run(&config).await,
        Commands::Scenario { id, role } => {
            commands::scenario::run(&config, id.as_deref(), role).await
        }
        Commands::Scenarios { command } => match command {
            ScenarioCommands::List => commands::scenarios::list(&config),
            ScenarioCommands::Show { id } => commands::scenarios::show(&config, &id),
        },
        Commands::Exec { prompt, json } => commands::exec::run(&config, &prompt, json).await,
        Commands::Models => commands::models::list(&config).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
