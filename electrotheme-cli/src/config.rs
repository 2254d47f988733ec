//! Agent configuration: file, then environment, then command-line flags.

use std::path::{Path, PathBuf};

use electrotheme_client::style::SurfaceConfig;
use electrotheme_client::ws::ClientConfig;
use electrotheme_core::config::{
    ConfigLoader, Configurable, EnvOverride, Validatable, ValidationContext, Validator,
};
use electrotheme_core::error::ConfigError;
use electrotheme_telemetry::logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "ELECTROTHEME";

/// Top-level configuration for the `electrotheme` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Control channel settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,

    /// Files the stylesheet is written to.
    #[serde(default)]
    pub surfaces: Vec<SurfaceConfig>,
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--endpoint`
    pub endpoint: Option<String>,
    /// `--identity`
    pub identity: Option<String>,
    /// `--surface`, appended to the configured surfaces
    pub surfaces: Vec<PathBuf>,
    /// `--verbose`
    pub verbose: bool,
}

impl CliOverrides {
    fn apply(&self, config: &mut AgentConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.client.endpoint.clone_from(endpoint);
        }
        if let Some(identity) = &self.identity {
            config.client.identity.clone_from(identity);
        }
        config
            .surfaces
            .extend(self.surfaces.iter().map(|path| SurfaceConfig {
                name: None,
                path: path.clone(),
            }));
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

impl AgentConfig {
    /// Loads the configuration from `path` (or defaults), applies
    /// `ELECTROTHEME_*` overrides, then the command-line flags, and validates
    /// the result.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new().with_env_prefix(ENV_PREFIX);
        let mut config: Self = match path {
            Some(path) => loader.load_file(path)?,
            None => Self::default(),
        };

        if let Some(prefix) = loader.env_prefix() {
            config.apply_env_overrides(prefix);
        }
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

impl Validatable for AgentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();

        ctx.enter("client");
        self.client.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("logging");
        Validator::new(&mut ctx).require_non_empty("level", &self.logging.level);
        ctx.exit();

        ctx.enter("surfaces");
        for (index, surface) in self.surfaces.iter().enumerate() {
            Validator::new(&mut ctx).custom(
                &format!("{index}.path"),
                || !surface.path.as_os_str().is_empty(),
                "Surface path must not be empty",
            );
        }
        ctx.exit();

        ctx.into_result()
    }
}

impl Configurable for AgentConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.client.apply_env_overrides(prefix);
        EnvOverride::apply_string(&format!("{prefix}_LOG_LEVEL"), &mut self.logging.level);
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        let mut names = ClientConfig::env_var_names(prefix);
        names.push(format!("{prefix}_LOG_LEVEL"));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(extension: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(extension).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.surfaces.is_empty());
    }

    #[test]
    fn test_load_yaml_file() {
        let file = write_config(
            ".yaml",
            r"
client:
  endpoint: ws://127.0.0.1:9000/client
  identity: app.exe
  max_retry_delay_ms: 5000
logging:
  level: warn
  format: json
surfaces:
  - name: main
    path: /tmp/electrotheme/main.css
",
        );

        let config = AgentConfig::load(Some(file.path()), &CliOverrides::default()).unwrap();
        assert_eq!(config.client.identity, "app.exe");
        assert_eq!(config.client.max_retry_delay_ms, Some(5000));
        assert_eq!(config.client.base_retry_delay_ms, 50);
        assert_eq!(config.surfaces.len(), 1);
        assert_eq!(config.surfaces[0].name.as_deref(), Some("main"));
    }

    #[test]
    fn test_load_toml_file() {
        let file = write_config(
            ".toml",
            r#"
[client]
identity = "app.exe"
remove_security_policy_header = true
"#,
        );

        let config = AgentConfig::load(Some(file.path()), &CliOverrides::default()).unwrap();
        assert!(config.client.remove_security_policy_header);
    }

    #[test]
    fn test_cli_overrides_win() {
        let file = write_config(
            ".yaml",
            "client:\n  endpoint: ws://127.0.0.1:9000/client\n  identity: from-file\n",
        );
        let overrides = CliOverrides {
            endpoint: None,
            identity: Some("from-flag".to_string()),
            surfaces: vec![PathBuf::from("/tmp/theme.css")],
            verbose: true,
        };

        let config = AgentConfig::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.client.endpoint, "ws://127.0.0.1:9000/client");
        assert_eq!(config.client.identity, "from-flag");
        assert_eq!(config.surfaces[0].path, PathBuf::from("/tmp/theme.css"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let overrides = CliOverrides {
            endpoint: Some("http://127.0.0.1:64132".to_string()),
            ..CliOverrides::default()
        };
        let err = AgentConfig::load(None, &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field.contains("endpoint")));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let file = write_config(".ini", "client = 1");
        assert!(AgentConfig::load(Some(file.path()), &CliOverrides::default()).is_err());
    }

    #[test]
    fn test_env_var_names_include_log_level() {
        let names = AgentConfig::env_var_names(ENV_PREFIX);
        assert!(names.contains(&"ELECTROTHEME_ENDPOINT".to_string()));
        assert!(names.contains(&"ELECTROTHEME_LOG_LEVEL".to_string()));
    }

    #[test]
    fn test_config_serializes_back_to_yaml() {
        let yaml = serde_yaml::to_string(&AgentConfig::default()).unwrap();
        let parsed: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, AgentConfig::default());
    }
}
