//! The style agent: session, store and registry wired together.
//!
//! On open the agent announces itself with `Hello`. Every `StylesUpdate`
//! replaces the stored payload and re-broadcasts it. Consumers created later
//! receive the current payload once, on creation.

use electrotheme_core::error::{NetworkError, ThemeError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::style::{Consumer, ConsumerRegistry, StyleStore};
use crate::ws::{ClientConfig, FrameSender, Message, Session, SessionCallback, SessionState, Transport};

/// How long shutdown waits for the transport to confirm the close.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Routes decoded messages to their handlers.
struct Dispatcher {
    identity: String,
    store: Arc<StyleStore>,
}

impl SessionCallback for Dispatcher {
    fn on_open(&self, sender: &FrameSender) {
        match sender.send(&Message::hello(&self.identity)) {
            Ok(()) => debug!(identity = %self.identity, "Hello sent"),
            Err(e) => warn!(
                error = %e,
                category = e.category(),
                recoverable = e.is_recoverable(),
                "Failed to send Hello"
            ),
        }
    }

    fn on_message(&self, message: Message) {
        match message {
            Message::StylesUpdate { css } => {
                let delivered = self.store.set(css);
                info!(
                    delivered,
                    revision = self.store.revision(),
                    "Applied style update"
                );
            }
            Message::Hello { exe } => debug!(%exe, "Ignoring Hello from coordinator"),
            Message::Unknown { kind } => debug!(%kind, "Ignoring unknown message type"),
        }
    }

    fn on_close(&self, reason: &NetworkError) {
        debug!(reason = %reason, "Control channel closed");
    }
}

/// Keeps every consumer in sync with the coordinator's stylesheet.
pub struct StyleAgent {
    session: Session,
    store: Arc<StyleStore>,
    registry: Arc<dyn ConsumerRegistry>,
    created: Option<mpsc::UnboundedReceiver<Arc<dyn Consumer>>>,
    started: bool,
    shutdown_timeout: Duration,
}

impl StyleAgent {
    /// Creates an agent. Nothing connects until [`StyleAgent::start`] or
    /// [`StyleAgent::run`].
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        registry: Arc<dyn ConsumerRegistry>,
    ) -> Self {
        let store = Arc::new(StyleStore::new(Arc::clone(&registry)));
        let dispatcher = Arc::new(Dispatcher {
            identity: config.identity.clone(),
            store: Arc::clone(&store),
        });

        Self {
            session: Session::new(config, transport, dispatcher),
            store,
            registry,
            created: None,
            started: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Overrides how long shutdown waits for the close to complete.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the style store.
    #[must_use]
    pub fn store(&self) -> &Arc<StyleStore> {
        &self.store
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies the current payload to existing consumers and opens the session.
    ///
    /// Consumers registered from here on are caught up by [`StyleAgent::step`].
    /// Calling it again is a no-op.
    pub fn start(&mut self) -> Result<(), NetworkError> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        self.created = Some(self.registry.subscribe());
        self.store.apply_all();
        self.session.connect()?;
        info!(endpoint = %self.session.endpoint(), "Style agent started");
        Ok(())
    }

    /// Handles one unit of work: a session event or a consumer creation.
    pub async fn step(&mut self) {
        let Self {
            session,
            store,
            registry,
            created,
            ..
        } = self;
        let next_created = async {
            match created.as_mut() {
                Some(rx) => rx.recv().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            Some(consumer) = next_created => deliver_to_new(store, registry.as_ref(), consumer.as_ref()),
            () = session.process_next() => {}
        }
    }

    /// Runs until `shutdown` resolves, then closes the session.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), ThemeError>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                () = self.step() => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Closes the session and waits, bounded by the shutdown timeout, for the
    /// transport to confirm.
    pub async fn shutdown(&mut self) {
        self.session.close();
        if tokio::time::timeout(self.shutdown_timeout, self.session.run_until_closed())
            .await
            .is_err()
        {
            warn!(
                timeout_ms = u64::try_from(self.shutdown_timeout.as_millis()).unwrap_or(u64::MAX),
                "Close not confirmed before shutdown timeout"
            );
        }
        if self.session.state() == SessionState::Closed {
            info!("Style agent stopped");
        }
    }
}

fn deliver_to_new(store: &StyleStore, registry: &dyn ConsumerRegistry, consumer: &dyn Consumer) {
    let id = consumer.id();
    if !registry.contains(&id) {
        debug!(consumer = %id, "Consumer unregistered before delivery");
        return;
    }
    if let Err(e) = store.apply_to(consumer) {
        let e = ThemeError::from(e);
        warn!(
            consumer = %id,
            error = %e,
            category = e.category(),
            severity = %e.severity(),
            "Delivery to new consumer failed"
        );
    }
}

impl std::fmt::Debug for StyleAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleAgent")
            .field("session", &self.session)
            .field("store", &self.store)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::InMemoryRegistry;
    use crate::testing::{MockTransport, RecordingConsumer};
    use crate::ws::TransportEventKind;

    struct Harness {
        agent: StyleAgent,
        transport: Arc<MockTransport>,
        registry: Arc<InMemoryRegistry>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(MockTransport::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let config = ClientConfig::builder()
            .endpoint("ws://127.0.0.1:64132/client")
            .identity("app.exe")
            .build();
        let agent = StyleAgent::new(&config, transport.clone(), registry.clone());
        Harness {
            agent,
            transport,
            registry,
        }
    }

    fn frame(text: &str) -> TransportEventKind {
        TransportEventKind::Frame(text.as_bytes().to_vec())
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_then_styles_update_reaches_consumers() {
        let mut h = harness();
        let c1 = Arc::new(RecordingConsumer::new("c1"));
        let c2 = Arc::new(RecordingConsumer::new("c2"));
        h.registry.register(c1.clone());
        h.registry.register(c2.clone());

        h.agent.start().unwrap();
        assert_eq!(h.transport.endpoint(0), "ws://127.0.0.1:64132/client");
        // Existing consumers get the empty payload at startup.
        assert_eq!(c1.delivered(), vec![String::new()]);

        h.transport.emit(0, TransportEventKind::Opened);
        h.agent.session.process_ready();
        assert_eq!(
            h.transport.sent_json(0),
            vec![serde_json::json!({"type": "Hello", "exe": "app.exe"})]
        );

        h.transport.emit(0, frame(r#"{"type":"StylesUpdate","css":"body{color:red}"}"#));
        h.agent.session.process_ready();

        assert_eq!(h.agent.store().get().as_str(), "body{color:red}");
        assert_eq!(c1.delivered().last().map(String::as_str), Some("body{color:red}"));
        assert_eq!(c2.delivered().last().map(String::as_str), Some("body{color:red}"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_consumer_gets_current_payload_once() {
        let mut h = harness();
        h.agent.start().unwrap();
        h.transport.emit(0, TransportEventKind::Opened);
        h.transport.emit(0, frame(r#"{"type":"StylesUpdate","css":"a{}"}"#));
        h.agent.session.process_ready();

        let late = Arc::new(RecordingConsumer::new("late"));
        h.registry.register(late.clone());
        h.agent.step().await;

        assert_eq!(late.delivered(), vec!["a{}"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consumer_registered_before_start_gets_payload_once() {
        let mut h = harness();
        let early = Arc::new(RecordingConsumer::new("early"));
        h.registry.register(early.clone());

        h.agent.start().unwrap();
        let _ = tokio::time::timeout(Duration::from_millis(10), h.agent.step()).await;

        assert_eq!(early.delivered(), vec![String::new()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_consumer_is_skipped() {
        let mut h = harness();
        h.agent.start().unwrap();

        let gone = Arc::new(RecordingConsumer::new("gone"));
        h.registry.register(gone.clone());
        h.registry.unregister(&gone.id());
        let _ = tokio::time::timeout(Duration::from_millis(10), h.agent.step()).await;

        assert!(gone.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_malformed_frames_change_nothing() {
        let mut h = harness();
        let consumer = Arc::new(RecordingConsumer::new("c"));
        h.registry.register(consumer.clone());
        h.agent.start().unwrap();

        h.transport.emit(0, TransportEventKind::Opened);
        h.transport.emit(0, frame(r#"{"type":"StylesUpdate","css":"x{}"}"#));
        h.transport.emit(0, frame(r#"{"type":"ScriptsUpdate","js":"alert(1)"}"#));
        h.transport.emit(0, frame("not valid json"));
        h.transport.emit(0, frame(r#"{"type":"Hello","exe":"other"}"#));
        h.agent.session.process_ready();

        assert!(h.agent.session().is_open());
        assert_eq!(h.agent.store().get().as_str(), "x{}");
        assert_eq!(h.agent.store().revision(), 1);
        assert_eq!(consumer.delivered(), vec!["", "x{}"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_is_resent_after_reconnect() {
        let mut h = harness();
        h.agent.start().unwrap();
        h.transport.emit(0, TransportEventKind::Opened);
        h.transport.emit(0, TransportEventKind::Closed { reason: None });
        h.agent.session.process_ready();

        h.agent.step().await;
        assert_eq!(h.transport.open_count(), 2);

        h.transport.emit(1, TransportEventKind::Opened);
        h.agent.session.process_ready();
        assert_eq!(h.transport.sent_json(1).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_closes_session_on_shutdown() {
        let h = harness();
        let transport = h.transport.clone();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let run = tokio::spawn(h.agent.with_shutdown_timeout(Duration::from_millis(100)).run(async {
            let _ = stop_rx.await;
        }));

        while transport.open_count() == 0 {
            tokio::task::yield_now().await;
        }

        stop_tx.send(()).unwrap();
        run.await.unwrap().unwrap();

        assert_eq!(transport.close_requests(0), 1);
        assert_eq!(transport.open_count(), 1);
    }
}
