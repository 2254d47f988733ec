//! Latest-value style store with broadcast to consumers.

use electrotheme_core::error::ConsumerError;
use electrotheme_telemetry::spans::{broadcast_span, delivery_span};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::{Consumer, ConsumerRegistry};

/// An opaque stylesheet. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StylePayload(Arc<str>);

impl StylePayload {
    /// Creates a payload from stylesheet text.
    #[must_use]
    pub fn new(css: impl Into<String>) -> Self {
        Self(Arc::from(css.into()))
    }

    /// Returns the stylesheet text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty stylesheet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for StylePayload {
    fn from(css: String) -> Self {
        Self::new(css)
    }
}

impl From<&str> for StylePayload {
    fn from(css: &str) -> Self {
        Self(Arc::from(css))
    }
}

impl fmt::Display for StylePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct Current {
    payload: StylePayload,
    revision: u64,
}

/// Holds the most recent payload and pushes it to every consumer.
///
/// Starts out empty. Each `set` replaces the payload and re-broadcasts;
/// there is no history.
pub struct StyleStore {
    current: RwLock<Current>,
    registry: Arc<dyn ConsumerRegistry>,
}

impl StyleStore {
    /// Creates an empty store broadcasting to `registry`.
    #[must_use]
    pub fn new(registry: Arc<dyn ConsumerRegistry>) -> Self {
        Self {
            current: RwLock::new(Current::default()),
            registry,
        }
    }

    /// Returns the current payload.
    #[must_use]
    pub fn get(&self) -> StylePayload {
        self.current.read().payload.clone()
    }

    /// Returns how many times the payload has been set.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.current.read().revision
    }

    /// Replaces the payload and broadcasts it. Returns the number of
    /// consumers that accepted it.
    pub fn set(&self, payload: impl Into<StylePayload>) -> usize {
        {
            let mut current = self.current.write();
            current.payload = payload.into();
            current.revision += 1;
        }
        self.apply_all()
    }

    /// Delivers the current payload to one consumer.
    pub fn apply_to(&self, consumer: &dyn Consumer) -> Result<(), ConsumerError> {
        let payload = self.get();
        let id = consumer.id();
        let span = delivery_span(id.as_str(), payload.len());
        let _guard = span.enter();

        consumer.deliver(&payload)?;
        debug!("Payload delivered");
        Ok(())
    }

    /// Delivers the current payload to every consumer the registry lists.
    ///
    /// A failing consumer is logged and skipped. Returns the number of
    /// successful deliveries.
    pub fn apply_all(&self) -> usize {
        let consumers = self.registry.consumers();
        let span = broadcast_span(self.get().len());
        let _guard = span.enter();

        let mut delivered = 0;
        for consumer in &consumers {
            match self.apply_to(consumer.as_ref()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(consumer = %consumer.id(), error = %e, "Delivery failed"),
            }
        }

        debug!(delivered, total = consumers.len(), "Broadcast complete");
        delivered
    }
}

impl fmt::Debug for StyleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.read();
        f.debug_struct("StyleStore")
            .field("payload_len", &current.payload.len())
            .field("revision", &current.revision)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::InMemoryRegistry;
    use crate::testing::RecordingConsumer;

    fn store_with(consumers: &[Arc<RecordingConsumer>]) -> StyleStore {
        let registry = Arc::new(InMemoryRegistry::new());
        for consumer in consumers {
            registry.register(consumer.clone());
        }
        StyleStore::new(registry)
    }

    #[test]
    fn test_store_starts_empty() {
        let store = store_with(&[]);
        assert!(store.get().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_set_broadcasts_to_every_consumer() {
        let a = Arc::new(RecordingConsumer::new("a"));
        let b = Arc::new(RecordingConsumer::new("b"));
        let store = store_with(&[a.clone(), b.clone()]);

        assert_eq!(store.set("body{color:red}"), 2);
        assert_eq!(store.get().as_str(), "body{color:red}");
        assert_eq!(a.delivered(), vec!["body{color:red}"]);
        assert_eq!(b.delivered(), vec!["body{color:red}"]);
    }

    #[test]
    fn test_last_write_wins() {
        let a = Arc::new(RecordingConsumer::new("a"));
        let store = store_with(&[a.clone()]);

        store.set("x");
        store.set("y");

        assert_eq!(store.get().as_str(), "y");
        assert_eq!(store.revision(), 2);
        assert_eq!(a.delivered().last().map(String::as_str), Some("y"));
    }

    #[test]
    fn test_failing_consumer_does_not_stop_broadcast() {
        let a = Arc::new(RecordingConsumer::failing("a"));
        let b = Arc::new(RecordingConsumer::new("b"));
        let store = store_with(&[a.clone(), b.clone()]);

        assert_eq!(store.set("p{}"), 1);
        assert!(a.delivered().is_empty());
        assert_eq!(b.delivered(), vec!["p{}"]);
    }

    #[test]
    fn test_apply_to_sends_current_payload() {
        let store = store_with(&[]);
        store.set("q{}");

        let late = RecordingConsumer::new("late");
        store.apply_to(&late).unwrap();
        assert_eq!(late.delivered(), vec!["q{}"]);
    }

    #[test]
    fn test_apply_to_empty_store_delivers_empty_payload() {
        let store = store_with(&[]);
        let consumer = RecordingConsumer::new("c");
        store.apply_to(&consumer).unwrap();
        assert_eq!(consumer.delivered(), vec![String::new()]);
    }
}
