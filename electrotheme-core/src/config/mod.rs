//! Configuration management module.
//!
//! This module provides the building blocks every configuration type in the
//! workspace uses:
//! - YAML, TOML and JSON configuration file loading
//! - Validation with descriptive error messages
//! - Environment variable overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use electrotheme_core::config::{ConfigLoader, ConfigFormat};
//!
//! let config: AgentConfig = ConfigLoader::new().load_file("agent.yaml")?;
//! let config: AgentConfig = ConfigLoader::new().load_str(toml_content, ConfigFormat::Toml)?;
//! ```

mod loader;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use traits::{Configurable, Validatable};
pub use validation::{EnvOverride, ValidationContext, ValidationResult, Validator};
