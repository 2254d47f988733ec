//! Test doubles shared by the unit tests.

use electrotheme_core::error::{ConsumerError, NetworkError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::style::{Consumer, ConsumerId, StylePayload};
use crate::ws::{
    Connection, EventSink, FrameSender, Message, SessionCallback, Transport, TransportCommand,
    TransportEventKind,
};

struct Opened {
    endpoint: String,
    events: EventSink,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
    sent: Vec<String>,
    closes: usize,
}

impl Opened {
    fn drain(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                TransportCommand::Send(text) => self.sent.push(text),
                TransportCommand::Close => self.closes += 1,
            }
        }
    }
}

/// Transport that records every open and lets the test script events.
#[derive(Default)]
pub(crate) struct MockTransport {
    opened: Mutex<Vec<Opened>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn endpoint(&self, index: usize) -> String {
        self.opened.lock()[index].endpoint.clone()
    }

    /// Reports `kind` on the `index`-th opened connection.
    pub fn emit(&self, index: usize, kind: TransportEventKind) {
        let events = self.opened.lock()[index].events.clone();
        events.emit(kind);
    }

    pub fn sent_frames(&self, index: usize) -> Vec<String> {
        let mut opened = self.opened.lock();
        opened[index].drain();
        opened[index].sent.clone()
    }

    pub fn sent_json(&self, index: usize) -> Vec<serde_json::Value> {
        self.sent_frames(index)
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn close_requests(&self, index: usize) -> usize {
        let mut opened = self.opened.lock();
        opened[index].drain();
        opened[index].closes
    }
}

impl Transport for MockTransport {
    fn open(&self, endpoint: &str, events: EventSink) -> Connection {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = events.connection();
        self.opened.lock().push(Opened {
            endpoint: endpoint.to_string(),
            events,
            commands: rx,
            sent: Vec::new(),
            closes: 0,
        });
        Connection::new(id, tx)
    }
}

/// Session callback that records what it sees.
#[derive(Default)]
pub(crate) struct RecordingCallback {
    opens: AtomicUsize,
    messages: Mutex<Vec<Message>>,
    errors: Mutex<Vec<NetworkError>>,
    closes: Mutex<Vec<NetworkError>>,
}

impl RecordingCallback {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn errors(&self) -> Vec<NetworkError> {
        self.errors.lock().clone()
    }

    pub fn closes(&self) -> Vec<NetworkError> {
        self.closes.lock().clone()
    }
}

impl SessionCallback for RecordingCallback {
    fn on_open(&self, _sender: &FrameSender) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    fn on_message(&self, message: Message) {
        self.messages.lock().push(message);
    }

    fn on_error(&self, error: &NetworkError) {
        self.errors.lock().push(error.clone());
    }

    fn on_close(&self, reason: &NetworkError) {
        self.closes.lock().push(reason.clone());
    }
}

/// Consumer that records every payload it is handed.
pub(crate) struct RecordingConsumer {
    id: ConsumerId,
    fail: bool,
    delivered: Mutex<Vec<String>>,
}

impl RecordingConsumer {
    pub fn new(id: &str) -> Self {
        Self {
            id: ConsumerId::new(id),
            fail: false,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(id: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

impl Consumer for RecordingConsumer {
    fn id(&self) -> ConsumerId {
        self.id.clone()
    }

    fn deliver(&self, payload: &StylePayload) -> Result<(), ConsumerError> {
        if self.fail {
            return Err(ConsumerError::DeliveryFailed {
                consumer: self.id.to_string(),
                reason: "rejected".to_string(),
            });
        }
        self.delivered.lock().push(payload.as_str().to_string());
        Ok(())
    }
}
