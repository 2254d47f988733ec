//! Error types and handling framework.
//!
//! The error system is organized hierarchically:
//! - `ThemeError` - Top-level error type
//!   - `NetworkError` - Transport and connection lifecycle errors
//!   - `ProtocolError` - Frame encoding and decoding errors
//!   - `ConfigError` - Configuration errors
//!   - `ConsumerError` - Payload delivery errors
//!
//! None of these are fatal to the host process. The worst outcome in the
//! control channel is a reconnect loop that never reaches the coordinator.
//!
//! ```
//! use electrotheme_core::error::{ProtocolError, ThemeError};
//!
//! let error = ProtocolError::malformed("{", "EOF while parsing an object");
//! let error = ThemeError::from(error);
//! assert_eq!(error.category(), "protocol");
//! assert!(error.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: the operation cannot continue with the current configuration
/// - `Recoverable`: the operation failed but will be retried or recovered
/// - `Warning`: degraded but non-blocking, logged and dropped
/// - `Info`: an expected condition such as an intentional shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error requiring attention.
    Fatal,

    /// Error that is recovered from through retry or fallback.
    #[default]
    Recoverable,

    /// Non-critical issue that should be logged but doesn't prevent operation.
    Warning,

    /// Informational message about an expected or handled condition.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal (unrecoverable).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod config;
mod consumer;
mod network;
mod protocol;

pub use config::ConfigError;
pub use consumer::ConsumerError;
pub use network::NetworkError;
pub use protocol::ProtocolError;

/// Top-level error type for the style agent.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeError {
    /// Transport or connection error.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Frame encoding or decoding error.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Payload delivery error.
    #[error("{0}")]
    Consumer(#[from] ConsumerError),
}

impl ThemeError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(e) => e.severity(),
            Self::Protocol(e) => e.severity(),
            Self::Config(e) => e.severity(),
            Self::Consumer(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Protocol(_) => "protocol",
            Self::Config(_) => "config",
            Self::Consumer(_) => "consumer",
        }
    }
}

/// A specialized Result type for style agent operations.
pub type Result<T> = std::result::Result<T, ThemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Fatal.to_string(), "FATAL");
        assert_eq!(ErrorSeverity::Recoverable.to_string(), "RECOVERABLE");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
    }

    #[test]
    fn test_network_error_conversion() {
        let network_err = NetworkError::ConnectionLost {
            reason: "peer went away".to_string(),
        };
        let err: ThemeError = network_err.into();
        assert_eq!(err.category(), "network");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_protocol_error_conversion() {
        let protocol_err = ProtocolError::malformed("nope", "expected value");
        let err: ThemeError = protocol_err.into();
        assert_eq!(err.category(), "protocol");
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err: ThemeError = ConfigError::missing_field("identity").into();
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_consumer_error_category() {
        let err: ThemeError = ConsumerError::DeliveryFailed {
            consumer: "main".to_string(),
            reason: "gone".to_string(),
        }
        .into();
        assert_eq!(err.category(), "consumer");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = ThemeError::Network(NetworkError::Timeout { timeout_ms: 3000 });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: ThemeError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
