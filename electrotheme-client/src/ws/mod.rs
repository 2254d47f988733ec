//! Control channel client.
//!
//! This module provides the reconnecting session to the coordinator:
//! - JSON message codec with a `type` discriminator
//! - Transport abstraction with a tokio-tungstenite implementation
//! - Session state machine with linear reconnect backoff
//!
//! # Example
//!
//! ```ignore
//! use electrotheme_client::ws::{ClientConfig, Message, Session, SessionCallback, WsTransport};
//!
//! struct Printer;
//!
//! impl SessionCallback for Printer {
//!     fn on_message(&self, message: Message) {
//!         println!("Received: {message:?}");
//!     }
//! }
//!
//! let config = ClientConfig::default();
//! let transport = Arc::new(WsTransport::new(config.connect_timeout()));
//! let mut session = Session::new(&config, transport, Arc::new(Printer));
//! session.connect()?;
//! session.run_until_closed().await;
//! ```

mod config;
mod message;
mod session;
mod state;
mod transport;

pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_ENDPOINT, FALLBACK_IDENTITY, default_identity,
};
pub use message::{Message, MessageCodec, MessageType, TypeEncoding};
pub use session::{FrameSender, Session, SessionCallback};
pub use state::SessionState;
pub use transport::{
    Connection, ConnectionId, EventSink, Transport, TransportCommand, TransportEvent,
    TransportEventKind, WsTransport,
};
