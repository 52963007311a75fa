//! Monitor consumers: one per configured queue, each reading the queue's
//! `_monitor` shadow and relaying every delivery as a `received` envelope.

use std::sync::Arc;

use async_trait::async_trait;
use stockrelay_broker::{AmqpBroker, BrokerError, Disposition};
use stockrelay_core::{monitor_queue, Envelope};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::relay::Relay;

/// Read side of the broker as the monitors see it.
#[async_trait]
pub trait MonitorSource: Send + Sync + 'static {
    /// Relay deliveries from `queue`'s monitor shadow until `cancel` fires
    /// (`Ok`) or the consumer breaks (`Err`).
    async fn consume_monitor(
        &self,
        queue: &str,
        prefetch: u16,
        cancel: CancellationToken,
        relay: &Relay,
    ) -> Result<(), BrokerError>;
}

#[async_trait]
impl MonitorSource for AmqpBroker {
    async fn consume_monitor(
        &self,
        queue: &str,
        prefetch: u16,
        cancel: CancellationToken,
        relay: &Relay,
    ) -> Result<(), BrokerError> {
        self.consume(&monitor_queue(queue), prefetch, cancel, |body| {
            handle_delivery(relay, queue, body)
        })
        .await
    }
}

/// Run a monitor consumer for each queue until `cancel` fires or one fails.
///
/// A failing consumer cancels its siblings so the caller can reconnect the
/// whole set at once. Returns `Ok(())` only on cancellation.
pub async fn run_monitors<S: MonitorSource>(
    source: Arc<S>,
    relay: Arc<Relay>,
    queues: Vec<String>,
    prefetch: u16,
    cancel: CancellationToken,
) -> Result<(), BrokerError> {
    let mut set = JoinSet::new();

    for queue in queues {
        let source = Arc::clone(&source);
        let relay = Arc::clone(&relay);
        let cancel = cancel.clone();
        set.spawn(async move { source.consume_monitor(&queue, prefetch, cancel, &relay).await });
    }

    let mut outcome = Ok(());
    while let Some(joined) = set.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(BrokerError::Consume {
                queue: "monitor".to_string(),
                reason: format!("monitor task failed: {e}"),
            }),
        };
        if let Err(e) = result {
            if outcome.is_ok() {
                warn!(error = %e, "monitor consumer stopped, stopping the rest");
                cancel.cancel();
                outcome = Err(e);
            }
        }
    }
    outcome
}

/// Turn one monitor delivery into a `received` envelope.
///
/// Every delivery is acknowledged: the monitor queue only exists for
/// observation, so a body that cannot be relayed is logged and dropped.
pub fn handle_delivery(relay: &Relay, queue: &str, body: &[u8]) -> Disposition {
    match Envelope::received(queue, body) {
        Ok(envelope) => {
            info!(queue, id = %envelope.id, "message received");
            relay.publish(envelope);
        }
        Err(e) => error!(queue, code = e.code(), error = %e, "dropping monitor delivery"),
    }
    Disposition::Ack
}
