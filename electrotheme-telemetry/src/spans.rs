//! Span definitions for tracing.
//!
//! Provides pre-defined spans for the agent's long-lived and per-event work:
//! - The control session as a whole
//! - Individual transport connections
//! - Payload delivery to consumers

use tracing::{Span, debug_span, info_span};

/// Create a span covering the lifetime of a control session.
///
/// # Example
///
/// ```
/// use electrotheme_telemetry::spans::session_span;
///
/// let span = session_span("ws://127.0.0.1:64132/client", "app.exe");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn session_span(endpoint: &str, identity: &str) -> Span {
    info_span!(
        "session",
        endpoint = %endpoint,
        identity = %identity
    )
}

/// Create a span for one transport connection.
#[must_use]
pub fn connection_span(connection_id: u64, endpoint: &str) -> Span {
    info_span!(
        "connection",
        connection.id = connection_id,
        endpoint = %endpoint
    )
}

/// Create a span for delivering the style payload to one consumer.
#[must_use]
pub fn delivery_span(consumer: &str, payload_len: usize) -> Span {
    debug_span!(
        "delivery",
        consumer = %consumer,
        payload.len = payload_len
    )
}

/// Create a span for a broadcast of the current payload to every consumer.
#[must_use]
pub fn broadcast_span(payload_len: usize) -> Span {
    debug_span!("broadcast", payload.len = payload_len)
}
