//! Owns the broker connection for the gateway's lifetime.
//!
//! connect (with retry) → publish slot filled → monitors run → on failure
//! the slot is emptied and the cycle starts again. Ingress answers 503
//! while the slot is empty. Exhausting the retry budget is fatal.

use std::sync::Arc;

use async_trait::async_trait;
use stockrelay_broker::{AmqpBroker, Broker, BrokerError};
use stockrelay_core::{config::BrokerConfig, RelayError};
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::monitor::{run_monitors, MonitorSource};

/// Opens broker sessions for the supervisor.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Broker + MonitorSource;

    /// Connect, retrying internally. An error means the budget is spent.
    async fn connect(&self) -> Result<Self::Session, BrokerError>;

    async fn close(&self, session: &Self::Session);
}

/// Connects to RabbitMQ with the configured retry policy.
pub struct AmqpConnector {
    config: BrokerConfig,
}

impl AmqpConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    type Session = AmqpBroker;

    async fn connect(&self) -> Result<AmqpBroker, BrokerError> {
        AmqpBroker::connect_with_config(&self.config).await
    }

    async fn close(&self, session: &AmqpBroker) {
        session.close().await;
    }
}

/// Returns `Ok(())` once shutdown is requested, or the fatal connection
/// error after the retry budget is spent.
pub async fn run<C: Connector>(state: Arc<AppState>, connector: C) -> Result<(), RelayError> {
    let cfg = state.config.broker.clone();
    let queues: Vec<String> = state.config.queue_names().map(String::from).collect();

    loop {
        let connected = tokio::select! {
            _ = state.shutdown.cancelled() => return Ok(()),
            result = connector.connect() => result,
        };
        let broker = Arc::new(connected?);

        state.broker.set(broker.clone());
        info!(queues = ?queues, "broker ready, starting monitors");

        let cycle = state.shutdown.child_token();
        let result = run_monitors(
            broker.clone(),
            state.relay.clone(),
            queues.clone(),
            cfg.prefetch,
            cycle,
        )
        .await;

        state.broker.clear();
        connector.close(&broker).await;

        match result {
            Ok(()) if state.shutdown.is_cancelled() => {
                info!("broker supervisor stopped");
                return Ok(());
            }
            Ok(()) => warn!("monitors stopped without shutdown, reconnecting"),
            Err(e) => error!(error = %e, "broker connection lost, reconnecting"),
        }

        // a connection that fails right after opening must not spin
        tokio::select! {
            _ = state.shutdown.cancelled() => return Ok(()),
            _ = tokio::time::sleep(Duration::from_secs(cfg.retry_delay_secs)) => {}
        }
    }
}
