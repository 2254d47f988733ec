//! Reconnecting control session.
//!
//! The session owns one connection at a time. Unexpected closes schedule a
//! reconnect after `retry_count × base` (linear backoff). A local `close()`
//! makes the session terminal.
//!
//! All state lives on the task that drives the session: transport events and
//! timer expiries are queued on one channel and applied by
//! [`Session::process_next`] / [`Session::process_ready`], so nothing here
//! needs a lock.

#![allow(clippy::redundant_pub_crate)]

use electrotheme_core::error::{NetworkError, ThemeError};
use electrotheme_telemetry::spans::session_span;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Span, debug, info, warn};

use super::config::ClientConfig;
use super::message::{Message, MessageCodec, MessageType, TypeEncoding};
use super::state::{InternalState, SessionState};
use super::transport::{
    Connection, ConnectionId, EventSink, Transport, TransportEvent, TransportEventKind,
};

/// Receives session events.
///
/// Callbacks run on the task that drives the session and must not block.
pub trait SessionCallback: Send + Sync {
    /// The connection is open. `sender` writes to it.
    fn on_open(&self, sender: &FrameSender) {
        let _ = sender;
    }

    /// A frame decoded successfully.
    fn on_message(&self, message: Message);

    /// The transport reported a fault.
    fn on_error(&self, error: &NetworkError) {
        let _ = error;
    }

    /// The connection closed.
    ///
    /// `reason` is `NetworkError::ShutdownClose` after a local close and
    /// `NetworkError::ConnectionLost` otherwise.
    fn on_close(&self, reason: &NetworkError) {
        let _ = reason;
    }
}

/// Writes encoded messages to the open connection.
#[derive(Debug, Clone)]
pub struct FrameSender {
    connection: Connection,
    codec: MessageCodec,
}

impl FrameSender {
    /// Returns the connection this sender writes to.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Encodes and sends a typed message.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if encoding fails or a network error if the
    /// connection has exited.
    pub fn send(&self, message: &Message) -> Result<(), ThemeError> {
        let text = self.codec.encode_message(message)?;
        self.connection.send_text(text)?;
        Ok(())
    }

    /// Encodes `fields` under `kind` and sends the result.
    ///
    /// # Errors
    ///
    /// Same as [`FrameSender::send`].
    pub fn send_fields<T: serde::Serialize>(
        &self,
        kind: MessageType,
        fields: &T,
    ) -> Result<(), ThemeError> {
        let text = self.codec.encode(kind, fields)?;
        self.connection.send_text(text)?;
        Ok(())
    }
}

/// Work queued for the session.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Transport(TransportEvent),
    ReconnectDue { timer: u64 },
}

#[derive(Debug)]
struct PendingReconnect {
    timer: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

/// A reconnecting control session.
///
/// # Example
///
/// ```ignore
/// use electrotheme_client::ws::{ClientConfig, Session, WsTransport};
///
/// let config = ClientConfig::default();
/// let transport = Arc::new(WsTransport::new(config.connect_timeout()));
/// let mut session = Session::new(&config, transport, callback);
/// session.connect()?;
/// loop {
///     session.process_next().await;
/// }
/// ```
pub struct Session {
    config: ClientConfig,
    codec: MessageCodec,
    transport: Arc<dyn Transport>,
    callback: Arc<dyn SessionCallback>,
    state: InternalState,
    connection: Option<Connection>,
    next_connection: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    pending_reconnect: Option<PendingReconnect>,
    next_timer: u64,
    last_scheduled_delay: Option<Duration>,
    span: Span,
}

impl Session {
    /// Creates an idle session. Nothing is opened until [`Session::connect`].
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        callback: Arc<dyn SessionCallback>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let encoding = if config.numeric_message_types {
            TypeEncoding::Code
        } else {
            TypeEncoding::Name
        };

        Self {
            config: config.clone(),
            codec: MessageCodec::with_encoding(encoding),
            transport,
            callback,
            state: InternalState::new(),
            connection: None,
            next_connection: 0,
            events_tx,
            events_rx,
            pending_reconnect: None,
            next_timer: 0,
            last_scheduled_delay: None,
            span: session_span(&config.endpoint, &config.identity),
        }
    }

    /// Returns the endpoint this session connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.state
    }

    /// Returns whether frames can be sent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.state.is_open()
    }

    /// Returns the failed reconnect attempts since the last successful open.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.state.retry_count
    }

    /// Returns true between an unexpected close and the next successful open.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.state.reconnecting
    }

    /// Returns the id of the current connection, if any.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(Connection::id)
    }

    /// Returns the delay of the pending reconnect, if one is scheduled.
    #[must_use]
    pub fn pending_reconnect_delay(&self) -> Option<Duration> {
        self.pending_reconnect.as_ref().map(|p| p.delay)
    }

    /// Returns the delay most recently chosen for a reconnect.
    #[must_use]
    pub fn last_scheduled_delay(&self) -> Option<Duration> {
        self.last_scheduled_delay
    }

    /// Opens a new connection, superseding any previous one.
    ///
    /// A pending reconnect timer is cancelled. Events still in flight from
    /// the previous connection are ignored once they arrive.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::ConnectionClosed` once the session has been closed.
    pub fn connect(&mut self) -> Result<(), NetworkError> {
        if self.state.state.is_shutting_down() {
            return Err(NetworkError::ConnectionClosed {
                reason: "session has been closed".to_string(),
            });
        }

        self.cancel_reconnect();
        if let Some(previous) = self.connection.take() {
            previous.close();
        }

        self.next_connection += 1;
        let id = ConnectionId::new(self.next_connection);
        self.state.mark_connecting();

        let _guard = self.span.enter();
        debug!(connection = %id, retry_count = self.state.retry_count, "Opening connection");

        let sink = EventSink::new(id, self.events_tx.clone());
        self.connection = Some(self.transport.open(&self.config.endpoint, sink));
        Ok(())
    }

    /// Requests a shutdown close. Idempotent.
    ///
    /// Cancels any pending reconnect. With a live connection the session
    /// waits in `Closing` for the transport to confirm; otherwise it goes
    /// straight to `Closed`.
    pub fn close(&mut self) {
        if self.state.state.is_shutting_down() {
            return;
        }

        self.cancel_reconnect();

        let _guard = self.span.enter();
        if let Some(connection) = &self.connection {
            info!(connection = %connection.id(), "Closing session");
            connection.close();
            self.state.mark_closing();
        } else {
            info!("Session closed");
            self.state.mark_closed();
        }
    }

    /// Encodes and sends a message on the open connection.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::ConnectionClosed` when the session is not
    /// open, or a protocol error if encoding fails.
    pub fn send(&self, message: &Message) -> Result<(), ThemeError> {
        match (&self.connection, self.state.state) {
            (Some(connection), SessionState::Open) => {
                let text = self.codec.encode_message(message)?;
                connection.send_text(text)?;
                Ok(())
            }
            (_, state) => Err(NetworkError::not_open(state).into()),
        }
    }

    /// Waits for the next queued event and applies it.
    ///
    /// Cancel safe: an event is either fully applied or left in the queue.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Applies every event that is already queued. Returns how many ran.
    pub fn process_ready(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Drives the session until it reaches `Closed`.
    pub async fn run_until_closed(&mut self) {
        while self.state.state != SessionState::Closed {
            self.process_next().await;
        }
    }

    pub(crate) fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport(event) => self.handle_transport(event),
            SessionEvent::ReconnectDue { timer } => self.handle_reconnect_due(timer),
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        if self.connection_id() != Some(event.connection) {
            debug!(connection = %event.connection, "Ignoring event from superseded connection");
            return;
        }

        match event.kind {
            TransportEventKind::Opened => self.on_opened(),
            TransportEventKind::Frame(bytes) => self.on_frame(&bytes),
            TransportEventKind::Error(error) => self.on_error(&error),
            TransportEventKind::Closed { reason } => self.on_closed(reason),
        }
    }

    fn on_opened(&mut self) {
        if self.state.self_close {
            // Close was requested while the handshake was in flight.
            return;
        }
        let Some(connection) = self.connection.clone() else {
            return;
        };

        self.state.mark_open();
        {
            let _guard = self.span.enter();
            info!(connection = %connection.id(), "Control channel open");
        }

        let sender = FrameSender {
            connection,
            codec: self.codec,
        };
        self.callback.on_open(&sender);
    }

    fn on_frame(&mut self, bytes: &[u8]) {
        self.state.record_frame();
        match self.codec.decode(bytes) {
            Ok(message) => self.callback.on_message(message),
            Err(e) => {
                let e = ThemeError::from(e);
                let _guard = self.span.enter();
                warn!(
                    error = %e,
                    category = e.category(),
                    severity = %e.severity(),
                    "Dropping malformed frame"
                );
            }
        }
    }

    fn on_error(&mut self, error: &NetworkError) {
        {
            let _guard = self.span.enter();
            let severity = error.severity();
            if self.state.record_error() {
                warn!(
                    error = %error,
                    %severity,
                    retry_count = self.state.retry_count,
                    "Reconnect attempt failed"
                );
            } else {
                warn!(error = %error, %severity, "Transport error");
            }
        }
        self.callback.on_error(error);
    }

    fn on_closed(&mut self, reason: Option<String>) {
        self.connection = None;

        if self.state.self_close {
            self.state.mark_closed();
            {
                let _guard = self.span.enter();
                info!("Session closed");
            }
            self.callback.on_close(&NetworkError::ShutdownClose);
            return;
        }

        let lost = NetworkError::ConnectionLost {
            reason: reason.unwrap_or_else(|| "transport closed".to_string()),
        };
        self.callback.on_close(&lost);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        self.state.mark_reconnect_scheduled();
        let delay = self.config.retry_delay(self.state.retry_count);

        self.next_timer += 1;
        let timer = self.next_timer;
        let events = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::ReconnectDue { timer });
        });

        {
            let _guard = self.span.enter();
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                retry_count = self.state.retry_count,
                "Connection lost, reconnect scheduled"
            );
        }

        self.last_scheduled_delay = Some(delay);
        self.pending_reconnect = Some(PendingReconnect {
            timer,
            delay,
            handle,
        });
    }

    fn handle_reconnect_due(&mut self, timer: u64) {
        if self.pending_reconnect.as_ref().map(|p| p.timer) != Some(timer) {
            debug!(timer, "Ignoring cancelled reconnect timer");
            return;
        }
        self.pending_reconnect = None;

        if self.state.state == SessionState::ReconnectScheduled
            && let Err(e) = self.connect()
        {
            warn!(error = %e, "Reconnect skipped");
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(pending) = self.pending_reconnect.take() {
            pending.handle.abort();
            debug!(timer = pending.timer, "Cancelled pending reconnect");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_reconnect();
        if !self.state.self_close
            && let Some(connection) = self.connection.take()
        {
            connection.close();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state.state)
            .field("retry_count", &self.state.retry_count)
            .field("connection", &self.connection_id())
            .finish_non_exhaustive()
    }
}
