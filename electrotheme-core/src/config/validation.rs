//! Configuration validation utilities.

use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Context for validation operations.
///
/// Tracks the current path in the configuration tree for better error messages.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Current path in the configuration (e.g., "client.endpoint").
    path: Vec<String>,
    /// Collected validation errors.
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new section in the configuration.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Exits the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Adds a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Consumes the context and returns the first error, if any.
    pub fn into_result(self) -> ValidationResult {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }

    /// Creates a missing field error with the current path context.
    #[must_use]
    pub fn missing_field(&self, field: impl Into<String>) -> ConfigError {
        let field = field.into();
        let section = if self.path.is_empty() {
            None
        } else {
            Some(self.current_path())
        };
        ConfigError::MissingField { field, section }
    }

    /// Creates an invalid value error with the current path context.
    #[must_use]
    pub fn invalid_value(
        &self,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> ConfigError {
        let field_name = field.into();
        let full_field = if self.path.is_empty() {
            field_name
        } else {
            format!("{}.{}", self.current_path(), field_name)
        };
        ConfigError::InvalidValue {
            field: full_field,
            reason: reason.into(),
        }
    }
}

/// Fluent validator writing into a [`ValidationContext`].
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator with the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Validates that a string field is not empty.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.ctx.add_error(self.ctx.missing_field(field));
        }
        self
    }

    /// Validates that a numeric value is positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if *value <= T::default() {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be positive")),
            );
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.ctx.add_error(self.ctx.invalid_value(field, error_msg));
        }
        self
    }

    /// Validates a WebSocket URL (`ws://` or `wss://` with a host part).
    pub fn websocket_url(&mut self, field: &str, value: &str) -> &mut Self {
        let rest = value
            .strip_prefix("ws://")
            .or_else(|| value.strip_prefix("wss://"));
        match rest {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {}
            _ => self.ctx.add_error(
                self.ctx
                    .invalid_value(field, "Must be a WebSocket URL (ws://host or wss://host)"),
            ),
        }
        self
    }

    /// Returns the validation result.
    pub fn result(&self) -> ValidationResult {
        match self.ctx.errors().first() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Environment variable helper for applying overrides.
///
/// Unset variables leave the target untouched, and so do values that do
/// not parse.
///
/// ```rust
/// use electrotheme_core::config::EnvOverride;
///
/// let mut value = "default".to_string();
/// EnvOverride::apply_string("ELECTROTHEME_DOC_UNSET_VAR", &mut value);
/// assert_eq!(value, "default");
/// ```
pub struct EnvOverride;

impl EnvOverride {
    /// Applies an environment variable override to a string value.
    pub fn apply_string(var_name: &str, target: &mut String) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value;
        }
    }

    /// Applies an environment variable override to a numeric value.
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(value) = std::env::var(var_name)
            && let Ok(parsed) = value.parse()
        {
            *target = parsed;
        }
    }

    /// Applies an environment variable override to an optional numeric value.
    ///
    /// An empty value clears the target.
    pub fn apply_optional_number<T: std::str::FromStr>(var_name: &str, target: &mut Option<T>) {
        if let Ok(value) = std::env::var(var_name) {
            if value.trim().is_empty() {
                *target = None;
            } else if let Ok(parsed) = value.parse() {
                *target = Some(parsed);
            }
        }
    }

    /// Applies an environment variable override to a boolean value.
    pub fn apply_bool(var_name: &str, target: &mut bool) {
        if let Ok(value) = std::env::var(var_name) {
            match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => *target = true,
                "false" | "0" | "no" | "off" => *target = false,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_context_path() {
        let mut ctx = ValidationContext::new();
        assert_eq!(ctx.current_path(), "");

        ctx.enter("agent");
        ctx.enter("client");
        assert_eq!(ctx.current_path(), "agent.client");

        ctx.exit();
        assert_eq!(ctx.current_path(), "agent");
    }

    #[test]
    fn test_invalid_value_is_path_qualified() {
        let mut ctx = ValidationContext::new();
        ctx.enter("client");
        let err = ctx.invalid_value("endpoint", "bad");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "client.endpoint"));
    }

    #[test]
    fn test_validator_require_non_empty() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).require_non_empty("identity", "  ");
        assert!(matches!(
            ctx.into_result(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validator_positive() {
        let mut ctx = ValidationContext::new();
        let mut validator = Validator::new(&mut ctx);
        validator.positive("base_retry_delay_ms", &50u64);
        assert!(validator.result().is_ok());
        validator.positive("base_retry_delay_ms", &0u64);
        assert!(validator.result().is_err());
    }

    #[test]
    fn test_validator_websocket_url() {
        for ok in ["ws://127.0.0.1:64132/client", "wss://example.com"] {
            let mut ctx = ValidationContext::new();
            Validator::new(&mut ctx).websocket_url("endpoint", ok);
            assert!(ctx.is_valid(), "{ok} should be accepted");
        }
        for bad in ["http://127.0.0.1", "ws://", "ws:///client", "127.0.0.1:64132", ""] {
            let mut ctx = ValidationContext::new();
            Validator::new(&mut ctx).websocket_url("endpoint", bad);
            assert!(!ctx.is_valid(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_validator_custom() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).custom("max_retry_delay_ms", || false, "below base delay");
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_env_override_unset_leaves_value() {
        let mut flag = false;
        EnvOverride::apply_bool("ELECTROTHEME_TEST_UNSET_BOOL_1", &mut flag);
        assert!(!flag);

        let mut number = 7u64;
        EnvOverride::apply_number("ELECTROTHEME_TEST_UNSET_NUM_1", &mut number);
        assert_eq!(number, 7);

        let mut cap = Some(5u64);
        EnvOverride::apply_optional_number("ELECTROTHEME_TEST_UNSET_OPT_1", &mut cap);
        assert_eq!(cap, Some(5));
    }
}
