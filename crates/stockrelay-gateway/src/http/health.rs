use axum::{extract::State, Json};
use std::sync::Arc;
use stockrelay_protocol::HealthBody;

use crate::app::AppState;

/// GET /api/health: liveness check with relay counters.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
        messages_count: state.relay.history_len(),
        subscribers: state.relay.subscriber_count(),
        broker_connected: state.broker.is_connected(),
    })
}
