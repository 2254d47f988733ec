//! # Electrotheme Core
//!
//! Shared types for the electrotheme style agent.
//!
//! This crate provides:
//! - Error types and handling framework
//! - Agent and client configuration types
//! - Configuration loading with YAML/TOML/JSON support and environment variable overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{
        ConfigError, ConsumerError, ErrorSeverity, NetworkError, ProtocolError, ThemeError,
    };
}
