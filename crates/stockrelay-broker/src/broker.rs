use async_trait::async_trait;
use stockrelay_core::monitor_queue;

use crate::error::Result;

/// Write side of the message broker.
///
/// Implementations must be `Send + Sync` so one connected instance can be
/// shared by every request handler.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Stable lowercase identifier used in logs (e.g. `"amqp"`).
    fn name(&self) -> &str;

    /// Declare `queue` durable (idempotent), then write `payload` to it with
    /// persistent delivery.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Whether the underlying connection is still usable.
    fn is_connected(&self) -> bool;
}

/// Publish to the primary queue, then to its monitor queue.
///
/// Stops at the first failure; a failed monitor write leaves the primary
/// write in place (there is no transaction spanning both queues).
pub async fn publish_with_monitor(broker: &dyn Broker, queue: &str, payload: &[u8]) -> Result<()> {
    broker.publish(queue, payload).await?;
    broker.publish(&monitor_queue(queue), payload).await
}
