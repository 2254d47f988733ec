//! Payload delivery errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a consumer cannot take the current style payload.
///
/// Delivery failures are per consumer: the broadcast logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumerError {
    /// The consumer rejected or failed to apply the payload.
    #[error("[Consumer] Delivery to '{consumer}' failed: {reason}")]
    DeliveryFailed {
        /// Identifier of the consumer.
        consumer: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The consumer no longer exists.
    #[error("[Consumer] '{consumer}' is gone")]
    Gone {
        /// Identifier of the consumer.
        consumer: String,
    },
}

impl ConsumerError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::DeliveryFailed { .. } => ErrorSeverity::Recoverable,
            Self::Gone { .. } => ErrorSeverity::Info,
        }
    }
}
