use serde_json::Value;
use stockrelay_broker::{AmqpBroker, Disposition};
use stockrelay_core::{config::BrokerConfig, RelayError};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::summary::summarize;

/// Drain `queue` until `cancel` fires.
///
/// A broken consumer is logged and the connection rebuilt after the retry
/// delay. Only an exhausted connect budget ends the loop with an error.
pub async fn run(
    cfg: &BrokerConfig,
    queue: &str,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    loop {
        let connected = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = AmqpBroker::connect_with_config(cfg) => result,
        };
        let broker = connected?;
        info!(queue, "waiting for messages");

        let result = broker
            .consume(queue, cfg.prefetch, cancel.clone(), |body| handle(queue, body))
            .await;
        broker.close().await;

        match result {
            Ok(()) => return Ok(()),
            Err(e) => error!(queue, error = %e, "consumer stopped, reconnecting"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = sleep(Duration::from_secs(cfg.retry_delay_secs)) => {}
        }
    }
}

/// Log one delivery. Bodies that are not JSON are rejected without requeue.
pub fn handle(queue: &str, body: &[u8]) -> Disposition {
    match serde_json::from_slice::<Value>(body) {
        Ok(message) => {
            info!("{}", summarize(queue, &message));
            Disposition::Ack
        }
        Err(e) => {
            warn!(queue, error = %e, "rejecting malformed message");
            Disposition::Reject
        }
    }
}
