//! Style consumers and the registry that enumerates them.

use dashmap::DashMap;
use electrotheme_core::error::ConsumerError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::store::StylePayload;

/// Stable identifier of a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(String);

impl ConsumerId {
    /// Creates a consumer id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something that renders the current style payload.
pub trait Consumer: Send + Sync {
    /// Returns the consumer's id.
    fn id(&self) -> ConsumerId;

    /// Applies the payload, replacing whatever was applied before.
    fn deliver(&self, payload: &StylePayload) -> Result<(), ConsumerError>;
}

/// Source of consumers.
pub trait ConsumerRegistry: Send + Sync {
    /// Returns every live consumer.
    fn consumers(&self) -> Vec<Arc<dyn Consumer>>;

    /// Subscribes to consumer creation. Each consumer registered after this
    /// call is sent once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<dyn Consumer>>;

    /// Returns true if a consumer with this id is still registered.
    ///
    /// A creation notification can be drained after the consumer is gone;
    /// callers check this before delivering to it.
    fn contains(&self, id: &ConsumerId) -> bool {
        self.consumers().iter().any(|consumer| &consumer.id() == id)
    }
}

/// Registry backed by an in-process map.
#[derive(Default)]
pub struct InMemoryRegistry {
    consumers: DashMap<ConsumerId, Arc<dyn Consumer>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Arc<dyn Consumer>>>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a consumer and notifies subscribers.
    ///
    /// Returns the consumer previously registered under the same id.
    pub fn register(&self, consumer: Arc<dyn Consumer>) -> Option<Arc<dyn Consumer>> {
        let id = consumer.id();
        let previous = self.consumers.insert(id.clone(), Arc::clone(&consumer));

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(Arc::clone(&consumer)).is_ok());
        debug!(consumer = %id, subscribers = subscribers.len(), "Consumer registered");

        previous
    }

    /// Removes a consumer.
    ///
    /// A creation notification already queued for it is still delivered to
    /// subscribers; [`ConsumerRegistry::contains`] reports it as gone.
    pub fn unregister(&self, id: &ConsumerId) -> Option<Arc<dyn Consumer>> {
        self.consumers.remove(id).map(|(_, consumer)| consumer)
    }

    /// Returns the number of registered consumers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    /// Returns true if no consumers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

impl ConsumerRegistry for InMemoryRegistry {
    fn consumers(&self) -> Vec<Arc<dyn Consumer>> {
        let mut consumers: Vec<_> = self
            .consumers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        consumers.sort_by_key(|c| c.id());
        consumers
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<dyn Consumer>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn contains(&self, id: &ConsumerId) -> bool {
        self.consumers.contains_key(id)
    }
}

impl fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("consumers", &self.consumers.len())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}
