//! # Electrotheme Telemetry
//!
//! Logging and tracing for the electrotheme style agent.
//!
//! This crate provides:
//! - Structured logging with JSON and pretty formats
//! - Stdout and rolling file outputs
//! - Span constructors for the control channel and payload delivery

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Span definitions for tracing
pub mod spans;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::spans::*;
}
