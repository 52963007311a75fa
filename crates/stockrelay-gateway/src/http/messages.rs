//! Message API.
//!
//! `GET  /api/messages`  current history, oldest first
//! `POST /api/messages`  `{"queue": "...", "message": {...}}` → 201 with the
//!                       normalized payload, or `{"error": "..."}`

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use stockrelay_core::Envelope;
use stockrelay_protocol::{ErrorBody, SubmitRequest, SubmitResponse};
use tracing::debug;

use crate::app::AppState;
use crate::ingress;

/// GET /api/messages
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Envelope>> {
    Json(state.relay.snapshot())
}

/// POST /api/messages
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            let body = ErrorBody::new("Invalid JSON body").with_details(rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match ingress::submit(&state, &req).await {
        Ok(data) => (StatusCode::CREATED, Json(SubmitResponse::accepted(data))).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_router;
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use stockrelay_broker::MemoryBroker;
    use stockrelay_core::{Direction, RelayConfig};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn setup() -> (Arc<AppState>, Arc<MemoryBroker>, Router) {
        let state = Arc::new(AppState::new(RelayConfig::default(), CancellationToken::new()));
        let broker = Arc::new(MemoryBroker::new());
        state.broker.set(broker.clone());
        let router = build_router(state.clone());
        (state, broker, router)
    }

    async fn post(router: Router, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, req).await
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(router, req).await
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn order_is_published_normalized_and_relayed() {
        let (state, broker, router) = setup();
        let mut sub = state.relay.subscribe();

        let (status, body) = post(
            router,
            json!({
                "queue": "orders",
                "message": { "order_id": "ORD-1", "item": "Widget", "quantity": 2, "user": "alice" }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Message sent successfully");
        let data = &body["data"];
        assert_eq!(data["order_id"], "ORD-1");
        assert_eq!(data["quantity"], 2);
        let keys: Vec<&str> = data.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["order_id", "item", "quantity", "user", "timestamp"]);
        assert!(data["timestamp"].as_str().unwrap().ends_with('Z'));

        assert_eq!(broker.published_queues(), ["orders", "orders_monitor"]);
        let published = broker.published();
        assert_eq!(published[0].1, published[1].1);
        let on_wire: Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(&on_wire, data);

        let history = state.relay.snapshot();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].queue, "orders");
        assert_eq!(history[0].direction, Direction::Sent);
        assert_eq!(history[0].content.as_bytes(), published[0].1.as_slice());

        sub.frames.try_recv().unwrap(); // history
        let live: Value = serde_json::from_str(&sub.frames.try_recv().unwrap()).unwrap();
        assert_eq!(live["type"], "sent");
        assert_eq!(live["id"], history[0].id.as_str());
    }

    #[tokio::test]
    async fn missing_required_field_has_no_side_effects() {
        let (state, broker, router) = setup();

        let (status, body) = post(
            router,
            json!({ "queue": "alerts", "message": { "item": "Widget", "threshold": 5 } }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "alerts message must include item and stock_level");
        assert_eq!(body["missing"], json!(["stock_level"]));
        assert!(broker.published().is_empty());
        assert_eq!(state.relay.history_len(), 0);
    }

    #[tokio::test]
    async fn zero_stock_level_is_accepted() {
        let (_state, broker, router) = setup();

        let (status, body) = post(
            router,
            json!({ "queue": "alerts", "message": { "item": "Widget", "stock_level": 0 } }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["stock_level"], 0);
        assert_eq!(body["data"]["threshold"], 5);
        assert_eq!(body["data"]["type"], "inventory_alert");
        assert_eq!(broker.published_queues(), ["alerts", "alerts_monitor"]);
    }

    #[tokio::test]
    async fn unknown_queue_is_rejected() {
        let (_state, broker, router) = setup();
        let request = json!({ "queue": "returns", "message": { "id": 1 } });
        let (status, body) = post(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid queue");
        assert_eq!(body["details"], "returns is not a configured queue");
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn missing_queue_or_message_is_rejected() {
        let (_state, _broker, router) = setup();
        let (status, body) = post(router.clone(), json!({ "queue": "orders" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Queue and message are required");

        let (status, _) = post(router, json!({ "message": { "order_id": "ORD-1" } })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (_state, _broker, router) = setup();
        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn no_broker_is_service_unavailable() {
        let (state, broker, router) = setup();
        broker.set_connected(false);

        let (status, body) = post(
            router,
            json!({
                "queue": "orders",
                "message": { "order_id": "ORD-1", "item": "Widget", "quantity": 1, "user": "alice" }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "RabbitMQ not connected");
        assert_eq!(state.relay.history_len(), 0);
    }

    #[tokio::test]
    async fn broker_check_precedes_field_validation() {
        let (state, _broker, router) = setup();
        state.broker.clear();

        // invalid fields, but the broker is down: 503 wins
        let (status, _) = post(router, json!({ "queue": "orders", "message": {} })).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn publish_failure_is_internal_error() {
        let (state, broker, router) = setup();
        broker.set_fail_publishes(true);

        let (status, body) = post(
            router,
            json!({
                "queue": "billing",
                "message": {
                    "invoice_id": "INV-1",
                    "customer": "ACME",
                    "item": "Widget",
                    "total": 10.5
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send message");
        assert!(body["details"].as_str().unwrap().contains("billing"));
        assert_eq!(state.relay.history_len(), 0);
    }

    #[tokio::test]
    async fn list_returns_history_in_order() {
        let (state, _broker, router) = setup();
        state.relay.publish(Envelope::sent("orders", "1"));
        state.relay.publish(Envelope::sent("alerts", "2"));

        let (status, body) = get(router, "/api/messages").await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["content"], "1");
        assert_eq!(items[1]["queue"], "alerts");
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let (state, _broker, router) = setup();
        state.relay.publish(Envelope::sent("orders", "1"));

        let (status, body) = get(router, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["messagesCount"], 1);
        assert_eq!(body["subscribers"], 0);
        assert_eq!(body["brokerConnected"], true);
    }
}
