//! # Electrotheme CLI
//!
//! Command-line runner for the electrotheme style agent.
//!
//! This CLI provides commands for:
//! - Running the agent against the local theme coordinator
//! - Checking the effective configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::check::OutputFormat;
use config::{AgentConfig, CliOverrides};

/// Electrotheme - keeps application surfaces in sync with the theme coordinator
#[derive(Parser)]
#[command(name = "electrotheme")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (.yaml, .toml or .json)
    #[arg(short, long, global = true, env = "ELECTROTHEME_CONFIG")]
    config: Option<PathBuf>,

    /// Coordinator endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Identity announced to the coordinator
    #[arg(long, global = true)]
    identity: Option<String>,

    /// Write the stylesheet to this file (repeatable)
    #[arg(long = "surface", value_name = "PATH", global = true)]
    surfaces: Vec<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the agent until interrupted (default)
    Run,

    /// Validate the configuration and print the effective result
    CheckConfig {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            endpoint: self.endpoint.clone(),
            identity: self.identity.clone(),
            surfaces: self.surfaces.clone(),
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AgentConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let _guards = electrotheme_telemetry::logging::init_logging(&config.logging)
                .context("Failed to initialize logging")?;
            commands::run::run(config).await?;
        }
        Commands::CheckConfig { format } => commands::check::run(&config, format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_is_the_default_command() {
        let cli = Cli::try_parse_from(["electrotheme"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.surfaces.is_empty());
    }

    #[test]
    fn test_repeatable_surfaces_and_overrides() {
        let cli = Cli::try_parse_from([
            "electrotheme",
            "--surface",
            "/tmp/a.css",
            "--surface",
            "/tmp/b.css",
            "--identity",
            "app.exe",
            "-v",
            "run",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.surfaces.len(), 2);
        assert_eq!(overrides.identity.as_deref(), Some("app.exe"));
        assert!(overrides.verbose);
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_check_config_format() {
        let cli = Cli::try_parse_from(["electrotheme", "check-config", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::CheckConfig {
                format: OutputFormat::Json
            })
        ));
    }
}
