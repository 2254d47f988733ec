//! Session state management.

#![allow(clippy::redundant_pub_crate)]

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Lifecycle state of a control session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed, no connection attempted yet.
    Idle,
    /// A transport is being opened.
    Connecting,
    /// The transport is open and frames flow.
    Open,
    /// The transport closed unexpectedly and a reconnect timer is pending.
    ReconnectScheduled,
    /// Close was requested and the transport has not confirmed yet.
    Closing,
    /// Terminal. No further reconnects.
    Closed,
}

impl SessionState {
    /// Returns true if frames can be sent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true while the session is trying to get a connection up.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::ReconnectScheduled)
    }

    /// Returns true once close has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::ReconnectScheduled => write!(f, "ReconnectScheduled"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Bookkeeping behind the session state machine.
#[derive(Debug)]
pub(crate) struct InternalState {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Failed reconnect attempts since the last successful open.
    pub retry_count: u32,
    /// Set on an unexpected close, cleared by the next successful open.
    pub reconnecting: bool,
    /// Set once close was requested locally.
    pub self_close: bool,
    /// Whether the current attempt already bumped `retry_count`.
    pub attempt_counted: bool,
    /// Last successful open.
    pub last_opened: Option<Instant>,
    /// Last inbound frame.
    pub last_frame: Option<Instant>,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            retry_count: 0,
            reconnecting: false,
            self_close: false,
            attempt_counted: false,
            last_opened: None,
            last_frame: None,
        }
    }
}

impl InternalState {
    /// Creates a new internal state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a connection attempt.
    pub fn mark_connecting(&mut self) {
        self.state = SessionState::Connecting;
        self.attempt_counted = false;
    }

    /// Marks the transport as open, which ends any reconnect sequence.
    pub fn mark_open(&mut self) {
        self.state = SessionState::Open;
        self.retry_count = 0;
        self.reconnecting = false;
        self.last_opened = Some(Instant::now());
    }

    /// Records a transport error.
    ///
    /// Returns true if the error counted as a failed reconnect attempt. At
    /// most one error is counted per attempt.
    pub fn record_error(&mut self) -> bool {
        if self.reconnecting && !self.attempt_counted {
            self.retry_count = self.retry_count.saturating_add(1);
            self.attempt_counted = true;
            true
        } else {
            false
        }
    }

    /// Marks an unexpected close with a reconnect pending.
    pub fn mark_reconnect_scheduled(&mut self) {
        self.state = SessionState::ReconnectScheduled;
        self.reconnecting = true;
    }

    /// Marks a locally requested close as in flight.
    pub fn mark_closing(&mut self) {
        self.state = SessionState::Closing;
        self.self_close = true;
    }

    /// Marks the session as terminally closed.
    pub fn mark_closed(&mut self) {
        self.state = SessionState::Closed;
        self.self_close = true;
    }

    /// Records that a frame was received.
    pub fn record_frame(&mut self) {
        self.last_frame = Some(Instant::now());
    }
}
