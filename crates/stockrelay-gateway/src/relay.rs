use std::sync::{Mutex, MutexGuard, PoisonError};

use stockrelay_core::Envelope;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::history::HistoryBuffer;
use crate::ws::hub::FanoutHub;

/// History buffer and subscriber set behind one lock.
///
/// Holding a single lock across append + broadcast keeps every subscriber's
/// view in observation order, and lets `subscribe` take its snapshot and
/// join the live set atomically: an envelope lands either in the history
/// frame or in the live stream, never both and never neither.
#[derive(Debug)]
pub struct Relay {
    inner: Mutex<Inner>,
    subscriber_buffer: usize,
}

#[derive(Debug)]
struct Inner {
    history: HistoryBuffer,
    hub: FanoutHub,
}

/// A registered subscriber: its id and the queue of frames to write out.
#[derive(Debug)]
pub struct Subscription {
    pub id: String,
    pub frames: mpsc::Receiver<String>,
}

impl Relay {
    pub fn new(history_capacity: usize, subscriber_buffer: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                history: HistoryBuffer::new(history_capacity),
                hub: FanoutHub::new(),
            }),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    /// Append `envelope` to history and broadcast it. Returns how many
    /// subscribers accepted it.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let mut inner = self.lock();
        let delivered = inner.hub.broadcast(&envelope);
        debug!(
            id = %envelope.id,
            queue = %envelope.queue,
            direction = %envelope.direction,
            delivered,
            "envelope relayed"
        );
        inner.history.append(envelope);
        delivered
    }

    /// Register a new subscriber. Its first frame is the history snapshot.
    pub fn subscribe(&self) -> Subscription {
        let id = uuid::Uuid::new_v4().to_string();
        // +1 so a full history frame never counts against live capacity
        let (tx, frames) = mpsc::channel(self.subscriber_buffer + 1);

        let mut inner = self.lock();
        let snapshot = inner.history.snapshot();
        let count = snapshot.len();
        inner.hub.register(&id, tx, snapshot);
        let subscribers = inner.hub.len();
        info!(subscriber = %id, history = count, subscribers, "subscriber registered");

        Subscription { id, frames }
    }

    pub fn unsubscribe(&self, id: &str) {
        let mut inner = self.lock();
        if inner.hub.unregister(id) {
            info!(subscriber = %id, subscribers = inner.hub.len(), "subscriber removed");
        }
    }

    pub fn snapshot(&self) -> Vec<Envelope> {
        self.lock().history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().hub.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner holds no invariants a panicking holder could break halfway.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
