use futures_util::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions},
    types::FieldTable,
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::amqp::{declare_durable, AmqpBroker};
use crate::error::{BrokerError, Result};

/// What to tell the broker once a delivery has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge: the broker forgets the message.
    Ack,
    /// Negative-acknowledge without requeue: the message is dropped.
    Reject,
}

impl AmqpBroker {
    /// Consume `queue` until cancelled or the consumer breaks.
    ///
    /// The queue is declared durable first. Deliveries are handled strictly
    /// one at a time: `on_delivery` runs, the delivery is settled, and only
    /// then is the next one pulled. With `prefetch = 1` the broker never has
    /// more than one unacked message in flight for this consumer.
    ///
    /// Returns `Ok(())` on cancellation and `Err` when the stream errors or
    /// ends (connection lost), so callers can reconnect.
    pub async fn consume<F>(
        &self,
        queue: &str,
        prefetch: u16,
        cancel: CancellationToken,
        mut on_delivery: F,
    ) -> Result<()>
    where
        F: FnMut(&[u8]) -> Disposition + Send,
    {
        let channel = self.consumer_channel(prefetch).await?;
        declare_durable(&channel, queue, self.op_timeout).await?;

        let tag = format!("stockrelay-{}", uuid::Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(queue, &tag, BasicConsumeOptions::default(), FieldTable::default())
            .await
            .map_err(|e| BrokerError::Consume {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;
        info!(queue, consumer_tag = %tag, prefetch, "consuming");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(queue, "consumer cancelled");
                    if let Err(e) = channel.close(200, "shutdown").await {
                        debug!(queue, error = %e, "channel close on shutdown failed");
                    }
                    return Ok(());
                }
                next = consumer.next() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    return Err(BrokerError::Consume {
                        queue: queue.to_string(),
                        reason: e.to_string(),
                    })
                }
                None => {
                    return Err(BrokerError::Consume {
                        queue: queue.to_string(),
                        reason: "consumer stream ended".to_string(),
                    })
                }
            };

            let disposition = on_delivery(&delivery.data);
            let settle = async {
                match disposition {
                    Disposition::Ack => delivery.acker.ack(BasicAckOptions::default()).await,
                    Disposition::Reject => {
                        delivery
                            .acker
                            .nack(BasicNackOptions {
                                requeue: false,
                                ..BasicNackOptions::default()
                            })
                            .await
                    }
                }
            };

            match timeout(self.op_timeout, settle).await {
                Ok(Ok(_)) => debug!(queue, ?disposition, "delivery settled"),
                Ok(Err(e)) => {
                    warn!(queue, error = %e, "failed to settle delivery");
                    return Err(BrokerError::Consume {
                        queue: queue.to_string(),
                        reason: format!("settle failed: {e}"),
                    });
                }
                Err(_) => {
                    warn!(queue, "settling delivery timed out");
                    return Err(BrokerError::Timeout {
                        op: "ack",
                        ms: self.op_timeout.as_millis() as u64,
                    });
                }
            }
        }
    }
}
