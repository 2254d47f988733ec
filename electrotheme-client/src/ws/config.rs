//! Control channel client configuration.

use electrotheme_core::config::{
    Configurable, EnvOverride, Validatable, ValidationContext, Validator,
};
use electrotheme_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint the coordinator listens on.
///
/// Loopback only and unauthenticated: anything running as the same user can
/// push styles to the agent.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:64132/client";

/// Identity used when the executable name cannot be determined.
pub const FALLBACK_IDENTITY: &str = "electrotheme";

/// Configuration for the control channel client.
///
/// Contains the coordinator endpoint, the identity announced in the Hello
/// handshake, and the reconnect backoff parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Coordinator WebSocket endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Executable or identity string sent in the Hello handshake.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Linear backoff step in milliseconds.
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Optional ceiling for the reconnect delay in milliseconds (None = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_delay_ms: Option<u64>,

    /// Connection attempt timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Ask the header-filter collaborator to strip content-security-policy.
    #[serde(default)]
    pub remove_security_policy_header: bool,

    /// Encode message types as numeric codes instead of names.
    #[serde(default)]
    pub numeric_message_types: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Returns the current executable's file name, which is what the
/// coordinator matches applications on.
pub fn default_identity() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

fn default_base_retry_delay_ms() -> u64 {
    50
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            identity: default_identity(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_retry_delay_ms: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            remove_security_policy_header: false,
            numeric_message_types: false,
        }
    }
}

impl ClientConfig {
    /// Creates a new builder for `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the backoff step as a Duration.
    #[must_use]
    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Calculates the reconnect delay for the given retry count.
    ///
    /// The delay grows linearly (`retry_count × base`) and is only capped
    /// when `max_retry_delay_ms` is set.
    #[must_use]
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let delay = self
            .base_retry_delay_ms
            .saturating_mul(u64::from(retry_count));
        let capped = match self.max_retry_delay_ms {
            Some(max) => delay.min(max),
            None => delay,
        };
        Duration::from_millis(capped)
    }

    /// Validates into an existing context, prefixing field names with its path.
    pub fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .websocket_url("endpoint", &self.endpoint)
            .require_non_empty("identity", &self.identity)
            .positive("base_retry_delay_ms", &self.base_retry_delay_ms)
            .positive("connect_timeout_ms", &self.connect_timeout_ms)
            .custom(
                "max_retry_delay_ms",
                || {
                    self.max_retry_delay_ms
                        .is_none_or(|max| max >= self.base_retry_delay_ms)
                },
                "Must not be smaller than base_retry_delay_ms",
            );
    }
}

impl Validatable for ClientConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        self.validate_with_context(&mut ctx);
        ctx.into_result()
    }
}

impl Configurable for ClientConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_ENDPOINT"), &mut self.endpoint);
        EnvOverride::apply_string(&format!("{prefix}_IDENTITY"), &mut self.identity);
        EnvOverride::apply_number(
            &format!("{prefix}_BASE_RETRY_DELAY_MS"),
            &mut self.base_retry_delay_ms,
        );
        EnvOverride::apply_optional_number(
            &format!("{prefix}_MAX_RETRY_DELAY_MS"),
            &mut self.max_retry_delay_ms,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_CONNECT_TIMEOUT_MS"),
            &mut self.connect_timeout_ms,
        );
        EnvOverride::apply_bool(
            &format!("{prefix}_REMOVE_CSP"),
            &mut self.remove_security_policy_header,
        );
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "ENDPOINT",
            "IDENTITY",
            "BASE_RETRY_DELAY_MS",
            "MAX_RETRY_DELAY_MS",
            "CONNECT_TIMEOUT_MS",
            "REMOVE_CSP",
        ]
        .iter()
        .map(|name| format!("{prefix}_{name}"))
        .collect()
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    identity: Option<String>,
    base_retry_delay_ms: Option<u64>,
    max_retry_delay_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    remove_security_policy_header: Option<bool>,
    numeric_message_types: Option<bool>,
}

impl ClientConfigBuilder {
    /// Sets the coordinator endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the identity announced in the Hello handshake.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Sets the backoff step.
    #[must_use]
    pub fn base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Caps the reconnect delay.
    #[must_use]
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets whether the content-security-policy header should be stripped.
    #[must_use]
    pub fn remove_security_policy_header(mut self, enabled: bool) -> Self {
        self.remove_security_policy_header = Some(enabled);
        self
    }

    /// Sets whether message types are encoded as numeric codes.
    #[must_use]
    pub fn numeric_message_types(mut self, enabled: bool) -> Self {
        self.numeric_message_types = Some(enabled);
        self
    }

    /// Builds the `ClientConfig`.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.unwrap_or_else(default_endpoint),
            identity: self.identity.unwrap_or_else(default_identity),
            base_retry_delay_ms: self
                .base_retry_delay_ms
                .unwrap_or_else(default_base_retry_delay_ms),
            max_retry_delay_ms: self.max_retry_delay_ms,
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            remove_security_policy_header: self.remove_security_policy_header.unwrap_or(false),
            numeric_message_types: self.numeric_message_types.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .endpoint("ws://127.0.0.1:9000/client")
            .identity("app.exe")
            .base_retry_delay(Duration::from_millis(20))
            .remove_security_policy_header(true)
            .build();

        assert_eq!(config.endpoint, "ws://127.0.0.1:9000/client");
        assert_eq!(config.identity, "app.exe");
        assert_eq!(config.base_retry_delay(), Duration::from_millis(20));
        assert!(config.remove_security_policy_header);
        assert!(!config.numeric_message_types);
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.base_retry_delay_ms, 50);
        assert_eq!(config.max_retry_delay_ms, None);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(!config.identity.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_linear_backoff_is_unbounded_by_default() {
        let config = ClientConfig::builder().identity("app.exe").build();

        assert_eq!(config.retry_delay(0), Duration::ZERO);
        assert_eq!(config.retry_delay(1), Duration::from_millis(50));
        assert_eq!(config.retry_delay(2), Duration::from_millis(100));
        assert_eq!(config.retry_delay(1_000), Duration::from_millis(50_000));
    }

    #[test]
    fn test_backoff_cap() {
        let config = ClientConfig::builder()
            .identity("app.exe")
            .max_retry_delay(Duration::from_millis(120))
            .build();

        assert_eq!(config.retry_delay(2), Duration::from_millis(100));
        assert_eq!(config.retry_delay(3), Duration::from_millis(120));
        assert_eq!(config.retry_delay(u32::MAX), Duration::from_millis(120));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_endpoint = ClientConfig::builder()
            .endpoint("http://127.0.0.1:64132/client")
            .build();
        assert!(bad_endpoint.validate().is_err());

        let empty_identity = ClientConfig::builder().identity("").build();
        assert!(matches!(
            empty_identity.validate(),
            Err(ConfigError::MissingField { .. })
        ));

        let zero_delay = ClientConfig::builder()
            .base_retry_delay(Duration::ZERO)
            .build();
        assert!(zero_delay.validate().is_err());

        let cap_below_base = ClientConfig::builder()
            .max_retry_delay(Duration::from_millis(10))
            .build();
        assert!(cap_below_base.validate().is_err());
    }

    #[test]
    fn test_env_var_names() {
        let names = ClientConfig::env_var_names("ELECTROTHEME");
        assert!(names.contains(&"ELECTROTHEME_ENDPOINT".to_string()));
        assert!(names.contains(&"ELECTROTHEME_REMOVE_CSP".to_string()));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"identity": "app.exe"}"#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.identity, "app.exe");
        assert_eq!(config.base_retry_delay_ms, 50);
    }
}
