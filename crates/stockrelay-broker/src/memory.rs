use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use tracing::debug;

use crate::broker::Broker;
use crate::error::{BrokerError, Result};

/// In-process broker that records every publish.
///
/// Backs tests and local runs without RabbitMQ. Publishes can be made to
/// fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail_publishes: AtomicBool,
    disconnected: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(queue, payload)` written so far, oldest first.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Queues written to, in publish order.
    pub fn published_queues(&self) -> Vec<String> {
        self.published().into_iter().map(|(q, _)| q).collect()
    }

    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish {
                queue: queue.to_string(),
                reason: "publishing disabled".to_string(),
            });
        }
        debug!(queue, size = payload.len(), "memory publish");
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((queue.to_string(), payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}
