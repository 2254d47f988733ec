//! # Electrotheme Client
//!
//! Control channel client and style delivery for the electrotheme agent.
//!
//! This crate provides:
//! - A reconnecting WebSocket session to the theme coordinator
//! - A latest-value style store that broadcasts to consumers
//! - A consumer registry with late-join delivery
//! - The agent binding that routes coordinator messages to the store
//!
//! # Architecture
//!
//! - `ws` - codec, transport and session state machine
//! - `style` - payload store, consumers and registry
//! - `agent` - dispatch binding and run loop
//! - `header_filter` - optional content-security-policy stripping
//!
//! # Example
//!
//! ```ignore
//! use electrotheme_client::prelude::*;
//!
//! let config = ClientConfig::default();
//! let registry = Arc::new(InMemoryRegistry::new());
//! registry.register(Arc::new(FileSurface::new("/tmp/theme.css")));
//!
//! let transport = Arc::new(WsTransport::new(config.connect_timeout()));
//! let agent = StyleAgent::new(&config, transport, registry);
//! agent.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

#![warn(missing_docs)]
#![allow(clippy::all)]
#![allow(clippy::pedantic)]
#![allow(clippy::cargo)]
#![allow(clippy::nursery)]

/// Control channel client
pub mod ws;

/// Style payload store and consumers
pub mod style;

/// Agent binding
pub mod agent;

/// Response header filtering
pub mod header_filter;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::StyleAgent;
    pub use crate::header_filter::{HeaderFilter, apply_security_policy_option};
    pub use crate::style::{
        Consumer, ConsumerId, ConsumerRegistry, FileSurface, InMemoryRegistry, StylePayload,
        StyleStore, SurfaceConfig,
    };
    pub use crate::ws::{
        ClientConfig, ClientConfigBuilder, Message, MessageCodec, Session, SessionCallback,
        SessionState, Transport, WsTransport,
    };
}
