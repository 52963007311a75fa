//! Message ingress: validate, normalize, publish, then relay as `sent`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use stockrelay_broker::Broker;
use stockrelay_core::{monitor_queue, Envelope, RelayError};
use stockrelay_protocol::{normalize, resolve, ErrorBody, SubmitRequest, ValidationError};
use thiserror::Error;
use tracing::{info, warn};

use crate::app::AppState;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::Validation(_) => StatusCode::BAD_REQUEST,
            IngressError::Relay(RelayError::BrokerUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            IngressError::Validation(e) => ErrorBody::from(e),
            IngressError::Relay(RelayError::BrokerUnavailable) => {
                ErrorBody::new("RabbitMQ not connected")
            }
            IngressError::Relay(e) => {
                ErrorBody::new("Failed to send message").with_details(e.to_string())
            }
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Accept one message for a configured queue.
///
/// Check order: request shape and queue name, then broker availability,
/// then per-field validation. Nothing is published or relayed unless every
/// check passes.
///
/// The `sent` envelope is relayed between the primary write and the monitor
/// write. The monitor consumer can only observe the message after the
/// monitor write, so `sent` always precedes its `received` twin. A failed
/// monitor write still returns 500; the primary write and the `sent` entry
/// stay in place.
pub async fn submit(
    state: &AppState,
    req: &SubmitRequest,
) -> Result<Map<String, Value>, IngressError> {
    let (schema, message) = resolve(&state.config.queues, req)?;

    let broker = state.broker.current().ok_or(RelayError::BrokerUnavailable)?;

    let payload = normalize(schema, message)?;
    let body = serde_json::to_string(&payload).map_err(RelayError::from)?;
    let queue = schema.name.as_str();

    publish(broker.as_ref(), queue, body.as_bytes()).await?;

    let envelope = Envelope::sent(queue, body.clone());
    info!(queue, id = %envelope.id, "message sent");
    state.relay.publish(envelope);

    publish(broker.as_ref(), &monitor_queue(queue), body.as_bytes()).await?;

    Ok(payload)
}

async fn publish(broker: &dyn Broker, queue: &str, body: &[u8]) -> Result<(), IngressError> {
    broker.publish(queue, body).await.map_err(|e| {
        warn!(queue, broker = broker.name(), error = %e, "publish failed");
        RelayError::from(e).into()
    })
}
