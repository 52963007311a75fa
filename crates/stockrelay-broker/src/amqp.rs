//! RabbitMQ (AMQP 0-9-1) implementation of [`Broker`].

use std::future::Future;

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use stockrelay_core::config::BrokerConfig;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::error::{BrokerError, Result};
use crate::retry::{connect_with_retry, RetryPolicy};

/// AMQP delivery mode that survives a broker restart.
const PERSISTENT: u8 = 2;

/// One connection plus one publishing channel.
pub struct AmqpBroker {
    pub(crate) connection: Connection,
    pub(crate) channel: Channel,
    pub(crate) op_timeout: Duration,
}

impl std::fmt::Debug for AmqpBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpBroker")
            .field("connected", &self.connection.status().connected())
            .finish_non_exhaustive()
    }
}

impl AmqpBroker {
    /// Single connection attempt: open the connection and a channel.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let connection = handshake(
            "connect",
            op_timeout,
            Connection::connect(url, ConnectionProperties::default()),
        )
        .await?;

        // Errors on an established connection are only logged; the owner
        // notices through `is_connected` or a consumer stream ending.
        connection.on_error(|e| error!(error = %e, "broker connection error"));

        let opened = handshake("open channel", op_timeout, connection.create_channel()).await;
        let channel = match opened {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(200, "channel open failed").await {
                    debug!(error = %close_err, "closing half-open connection failed");
                }
                return Err(e);
            }
        };

        Ok(Self { connection, channel, op_timeout })
    }

    /// Connect with the retry budget from `cfg`.
    pub async fn connect_with_config(cfg: &BrokerConfig) -> Result<Self> {
        let op_timeout = Duration::from_millis(cfg.operation_timeout_ms);
        connect_with_retry(&redact(&cfg.url), RetryPolicy::from(cfg), || {
            Self::connect(&cfg.url, op_timeout)
        })
        .await
    }

    /// Open a dedicated channel for a consumer, with its own prefetch limit.
    pub async fn consumer_channel(&self, prefetch: u16) -> Result<Channel> {
        let channel =
            handshake("open channel", self.op_timeout, self.connection.create_channel()).await?;
        handshake(
            "basic.qos",
            self.op_timeout,
            channel.basic_qos(prefetch, BasicQosOptions::default()),
        )
        .await?;
        Ok(channel)
    }

    /// Close the connection. Errors are logged; the connection is gone either way.
    pub async fn close(&self) {
        if !self.connection.status().connected() {
            return;
        }
        if let Err(e) = self.connection.close(200, "shutdown").await {
            warn!(error = %e, "error while closing broker connection");
        } else {
            info!("broker connection closed");
        }
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    fn name(&self) -> &str {
        "amqp"
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        declare_durable(&self.channel, queue, self.op_timeout).await?;

        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into());

        let write = async {
            self.channel
                .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
                .await?
                .await
        };

        match timeout(self.op_timeout, write).await {
            Ok(Ok(_)) => {
                debug!(queue, size = payload.len(), "published");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(queue, error = %e, "publish failed");
                Err(BrokerError::Publish {
                    queue: queue.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                error!(queue, "publish timed out");
                Err(BrokerError::Timeout {
                    op: "publish",
                    ms: self.op_timeout.as_millis() as u64,
                })
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

pub(crate) async fn declare_durable(
    channel: &Channel,
    queue: &str,
    op_timeout: Duration,
) -> Result<()> {
    let options = QueueDeclareOptions {
        durable: true,
        ..QueueDeclareOptions::default()
    };
    match timeout(op_timeout, channel.queue_declare(queue, options, FieldTable::default())).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(BrokerError::Declare {
            queue: queue.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(BrokerError::Timeout {
            op: "queue declare",
            ms: op_timeout.as_millis() as u64,
        }),
    }
}

/// Run one step of connection setup under `op_timeout`. A peer that never
/// answers the handshake costs one attempt, not the whole budget.
async fn handshake<T, F>(step: &'static str, op_timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, lapin::Error>>,
{
    match timeout(op_timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BrokerError::Connect(format!("{step}: {e}"))),
        Err(_) => Err(BrokerError::Connect(format!(
            "{step} timed out after {}ms",
            op_timeout.as_millis()
        ))),
    }
}

/// Strip credentials from an AMQP URL before it goes into a log line.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
