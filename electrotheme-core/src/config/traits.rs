//! Configuration traits for validation and environment overrides.

use crate::error::ConfigError;

/// Trait for configuration types that can check their own invariants.
///
/// # Example
///
/// ```rust
/// use electrotheme_core::config::Validatable;
/// use electrotheme_core::error::ConfigError;
///
/// struct Retry {
///     base_delay_ms: u64,
/// }
///
/// impl Validatable for Retry {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.base_delay_ms == 0 {
///             return Err(ConfigError::invalid_value("base_delay_ms", "must be positive"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Retry { base_delay_ms: 0 }.validate().is_err());
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for configuration types whose values can be overridden by
/// environment variables.
pub trait Configurable: Sized {
    /// Applies environment variable overrides to the configuration.
    ///
    /// `prefix` is the variable prefix, e.g. `ELECTROTHEME`.
    fn apply_env_overrides(&mut self, prefix: &str);

    /// Returns the names of the environment variables this type reads.
    fn env_var_names(prefix: &str) -> Vec<String>;
}
