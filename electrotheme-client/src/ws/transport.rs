//! Transport abstraction and the tokio-tungstenite implementation.
//!
//! A transport opens one connection per call and reports what happens on it
//! through an [`EventSink`]. Every event is tagged with the connection it
//! belongs to so the session can drop events from superseded connections.
//!
//! Contract for implementors: after `open`, emit at most one `Opened`, any
//! number of `Frame`/`Error`, and exactly one terminal `Closed`.

#![allow(clippy::redundant_pub_crate)]

use electrotheme_core::error::NetworkError;
use electrotheme_telemetry::spans::connection_span;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tracing::{Instrument, debug, info, warn};

use super::session::SessionEvent;

/// Identifies one transport connection within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The handshake completed.
    Opened,
    /// A text or binary frame arrived.
    Frame(Vec<u8>),
    /// The transport reported a fault. A `Closed` follows.
    Error(NetworkError),
    /// The connection is gone.
    Closed {
        /// Close reason from the peer or the local side, if any.
        reason: Option<String>,
    },
}

/// A transport event tagged with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Connection the event belongs to.
    pub connection: ConnectionId,
    /// The event itself.
    pub kind: TransportEventKind,
}

/// Instructions from the session to a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Write a text frame.
    Send(String),
    /// Start the close handshake.
    Close,
}

/// Where a transport reports events for one connection.
#[derive(Debug, Clone)]
pub struct EventSink {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { connection, tx }
    }

    /// Returns the connection this sink reports for.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Reports an event. Returns false once the session is gone.
    pub fn emit(&self, kind: TransportEventKind) -> bool {
        self.tx
            .send(SessionEvent::Transport(TransportEvent {
                connection: self.connection,
                kind,
            }))
            .is_ok()
    }
}

/// Session-side handle to one connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl Connection {
    /// Creates a handle from the command channel the transport listens on.
    #[must_use]
    pub fn new(id: ConnectionId, commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self { id, commands }
    }

    /// Returns the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::ConnectionClosed` if the transport task has exited.
    pub fn send_text(&self, text: String) -> Result<(), NetworkError> {
        self.commands
            .send(TransportCommand::Send(text))
            .map_err(|_| NetworkError::ConnectionClosed {
                reason: format!("connection {} has exited", self.id),
            })
    }

    /// Asks the transport to close. A no-op if it already exited.
    pub fn close(&self) {
        let _ = self.commands.send(TransportCommand::Close);
    }
}

/// Opens connections to the coordinator.
pub trait Transport: Send + Sync {
    /// Starts opening a connection and returns its handle immediately.
    ///
    /// The outcome arrives through `events`.
    fn open(&self, endpoint: &str, events: EventSink) -> Connection;
}

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    /// Creates a transport with the given connect timeout.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Transport for WsTransport {
    fn open(&self, endpoint: &str, events: EventSink) -> Connection {
        let id = events.connection();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let span = connection_span(id.get(), endpoint);

        tokio::spawn(
            run_connection(endpoint.to_string(), events, command_rx, self.connect_timeout)
                .instrument(span),
        );

        Connection::new(id, command_tx)
    }
}

async fn run_connection(
    endpoint: String,
    events: EventSink,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    connect_timeout: Duration,
) {
    let ws_stream = match timeout(connect_timeout, connect_async(endpoint.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            debug!(error = %e, "Connect failed");
            let error = match e {
                WsError::Url(url) => NetworkError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    reason: url.to_string(),
                },
                other => NetworkError::ConnectionFailed {
                    reason: other.to_string(),
                },
            };
            events.emit(TransportEventKind::Error(error));
            events.emit(TransportEventKind::Closed { reason: None });
            return;
        }
        Err(_) => {
            let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
            events.emit(TransportEventKind::Error(NetworkError::Timeout { timeout_ms }));
            events.emit(TransportEventKind::Closed { reason: None });
            return;
        }
    };

    debug!("WebSocket handshake complete");
    if !events.emit(TransportEventKind::Opened) {
        return;
    }

    let (mut sink, mut stream) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Send(text)) => {
                    if let Err(e) = sink.send(TungsteniteMessage::Text(text)).await {
                        warn!(error = %e, "Failed to send frame");
                        events.emit(TransportEventKind::Error(NetworkError::WebSocket {
                            reason: e.to_string(),
                        }));
                    }
                }
                Some(TransportCommand::Close) | None => {
                    debug!("Close requested");
                    let _ = sink.close().await;
                    break Some("closed by client".to_string());
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(TungsteniteMessage::Text(text))) => {
                    events.emit(TransportEventKind::Frame(text.into_bytes()));
                }
                Some(Ok(TungsteniteMessage::Binary(data))) => {
                    events.emit(TransportEventKind::Frame(data));
                }
                // tungstenite queues the pong reply itself
                Some(Ok(
                    TungsteniteMessage::Ping(_)
                    | TungsteniteMessage::Pong(_)
                    | TungsteniteMessage::Frame(_),
                )) => {}
                Some(Ok(TungsteniteMessage::Close(frame))) => {
                    info!("Coordinator sent close frame");
                    let _ = sink.close().await;
                    break frame.map(|f| f.reason.to_string());
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    events.emit(TransportEventKind::Error(NetworkError::WebSocket {
                        reason: e.to_string(),
                    }));
                    break Some(e.to_string());
                }
                None => break None,
            },
        }
    };

    events.emit(TransportEventKind::Closed { reason });
}
