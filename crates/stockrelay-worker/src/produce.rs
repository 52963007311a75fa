use anyhow::{Context, Result};
use serde_json::{Map, Value};
use stockrelay_broker::{publish_with_monitor, Broker};
use stockrelay_core::QueueSchema;
use stockrelay_protocol::{normalize, resolve, SubmitRequest};
use tracing::info;

/// Normalize each message for `queue` and publish it to the queue and its
/// monitor queue, in order. Every message is validated before the first
/// publish, so a bad one in the batch sends nothing.
pub async fn run(
    broker: &dyn Broker,
    queues: &[QueueSchema],
    queue: &str,
    messages: &[String],
) -> Result<Vec<Map<String, Value>>> {
    let mut payloads = Vec::with_capacity(messages.len());
    for (n, raw) in messages.iter().enumerate() {
        let label = format!("message #{}", n + 1);
        let message: Value =
            serde_json::from_str(raw).with_context(|| format!("{label} is not valid JSON"))?;
        let req = SubmitRequest {
            queue: Some(queue.to_string()),
            message: Some(message),
        };
        let (schema, object) = resolve(queues, &req).with_context(|| label.clone())?;
        let payload = normalize(schema, object).with_context(|| label.clone())?;
        payloads.push(payload);
    }

    for payload in &payloads {
        let body = serde_json::to_vec(payload)?;
        publish_with_monitor(broker, queue, &body)
            .await
            .with_context(|| format!("publishing to {queue}"))?;
        info!(queue, broker = broker.name(), "[Producer] sent {}", serde_json::Value::Object(payload.clone()));
    }
    Ok(payloads)
}
