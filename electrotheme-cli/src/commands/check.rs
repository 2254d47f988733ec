//! `electrotheme check-config`: print the effective configuration.

use anyhow::{Context, Result};
use clap::ValueEnum;

use electrotheme_core::config::{ConfigFormat, ConfigLoader};

use crate::config::AgentConfig;

/// Output format for `check-config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML
    #[default]
    Yaml,
    /// TOML
    Toml,
    /// JSON
    Json,
}

impl From<OutputFormat> for ConfigFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Self::Yaml,
            OutputFormat::Toml => Self::Toml,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Render the already-validated configuration.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render(config: &AgentConfig, format: OutputFormat) -> Result<String> {
    ConfigLoader::serialize(config, format.into()).context("Failed to serialize configuration")
}

/// Print the configuration to stdout.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn run(config: &AgentConfig, format: OutputFormat) -> Result<()> {
    println!("{}", render(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_each_format() {
        let config = AgentConfig::default();

        let yaml = render(&config, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("endpoint: ws://127.0.0.1:64132/client"));

        let json = render(&config, OutputFormat::Json).unwrap();
        assert!(json.contains("\"base_retry_delay_ms\": 50"));

        let toml = render(&config, OutputFormat::Toml).unwrap();
        assert!(toml.contains("[client]"));
    }
}
