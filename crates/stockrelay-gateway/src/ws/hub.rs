use std::collections::HashMap;

use stockrelay_core::{Envelope, RelayError};
use stockrelay_protocol::HistoryFrame;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, warn};

/// Fan-out to connected WS clients.
///
/// Each subscriber is the sending half of a bounded per-connection queue;
/// the connection task drains it into the socket. Sends never wait: a
/// closed or full queue drops that subscriber and the broadcast moves on.
#[derive(Debug, Default)]
pub struct FanoutHub {
    subscribers: HashMap<String, mpsc::Sender<String>>,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the `history` frame for a new subscriber, then add it to the
    /// live set. Returns false (and does not register) if the frame could
    /// not be queued.
    pub fn register(&mut self, id: &str, tx: mpsc::Sender<String>, history: Vec<Envelope>) -> bool {
        let frame = match serde_json::to_string(&HistoryFrame::new(history)) {
            Ok(f) => f,
            Err(e) => {
                error!(subscriber = id, error = %e, "failed to encode history frame");
                return false;
            }
        };
        if tx.try_send(frame).is_err() {
            warn!(subscriber = id, "subscriber gone before history was sent");
            return false;
        }
        self.subscribers.insert(id.to_string(), tx);
        true
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Push `envelope` to every subscriber. Returns how many accepted it.
    ///
    /// Fire-and-forget: no retries and no delivery confirmation.
    pub fn broadcast(&mut self, envelope: &Envelope) -> usize {
        let payload = match serde_json::to_string(envelope) {
            Ok(p) => p,
            Err(e) => {
                error!(envelope = %envelope.id, error = %e, "failed to encode envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        self.subscribers.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                let reason = match e {
                    TrySendError::Full(_) => "outbound queue full",
                    TrySendError::Closed(_) => "connection closed",
                };
                let err = RelayError::Transport(format!("subscriber {id}: {reason}"));
                warn!(code = err.code(), error = %err, "dropping subscriber");
                false
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
