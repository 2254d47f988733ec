//! Transport and connection lifecycle errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network error type covering connection failures, transport faults and
/// the two ways a connection can end.
///
/// # Examples
///
/// ```
/// use electrotheme_core::error::NetworkError;
///
/// let error = NetworkError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to the coordinator could not be established.
    #[error("[Network] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection attempt timed out.
    #[error("[Network] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Fault surfaced by the WebSocket layer.
    #[error("[Network] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// The transport closed without this client asking for it.
    #[error("[Network] Connection lost: {reason}")]
    ConnectionLost {
        /// Reason for the closure, if the peer gave one.
        reason: String,
    },

    /// The transport closed after an explicit shutdown request.
    #[error("[Network] Connection closed on shutdown")]
    ShutdownClose,

    /// An operation required an open connection.
    #[error("[Network] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason the operation was rejected.
        reason: String,
    },

    /// The endpoint address could not be used.
    #[error("[Network] Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The offending endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl NetworkError {
    /// Returns true if the session recovers from this error on its own.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::InvalidEndpoint { .. } => ErrorSeverity::Fatal,
            Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::WebSocket { .. }
            | Self::ConnectionLost { .. } => ErrorSeverity::Recoverable,
            Self::ConnectionClosed { .. } => ErrorSeverity::Warning,
            Self::ShutdownClose => ErrorSeverity::Info,
        }
    }

    /// Creates a `ConnectionClosed` error for a send attempted while not open.
    #[must_use]
    pub fn not_open(state: impl std::fmt::Display) -> Self {
        Self::ConnectionClosed {
            reason: format!("session is {state}, not open"),
        }
    }
}
