//! Frame encoding and decoding errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest stretch of raw frame text kept in an error.
const MAX_RAW_LEN: usize = 512;

/// Protocol error type for frames that cannot be encoded or decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// An inbound frame failed to decode. The frame is dropped.
    #[error("[Protocol] Malformed message ({reason}): {raw}")]
    MalformedMessage {
        /// The offending raw frame text, truncated.
        raw: String,
        /// Why decoding failed.
        reason: String,
    },

    /// An outbound message could not be encoded.
    #[error("[Protocol] Failed to encode message: {reason}")]
    Encode {
        /// Why encoding failed.
        reason: String,
    },
}

impl ProtocolError {
    /// Creates a `MalformedMessage` error, truncating the raw text.
    #[must_use]
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut raw = raw.into();
        if raw.len() > MAX_RAW_LEN {
            let mut cut = MAX_RAW_LEN;
            while !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            raw.truncate(cut);
            raw.push_str("...");
        }
        Self::MalformedMessage {
            raw,
            reason: reason.into(),
        }
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::MalformedMessage { .. } => ErrorSeverity::Warning,
            Self::Encode { .. } => ErrorSeverity::Recoverable,
        }
    }
}
