use axum::{routing::get, Router};
use std::sync::{Arc, PoisonError, RwLock};
use stockrelay_broker::Broker;
use stockrelay_core::RelayConfig;
use tokio_util::sync::CancellationToken;

use crate::relay::Relay;

/// Shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    pub relay: Arc<Relay>,
    /// The broker currently used for publishing; empty while (re)connecting.
    pub broker: BrokerSlot,
    /// Cancelled once on shutdown; WS connections and monitors watch it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Self {
        let relay = Arc::new(Relay::new(
            config.relay.history_capacity,
            config.relay.subscriber_buffer,
        ));
        Self {
            config,
            relay,
            broker: BrokerSlot::default(),
            shutdown,
        }
    }
}

/// Swappable handle to the connected broker.
///
/// The supervisor fills it after connecting and empties it when the
/// connection drops, so ingress sees "not connected" during a reconnect.
#[derive(Default)]
pub struct BrokerSlot {
    inner: RwLock<Option<Arc<dyn Broker>>>,
}

impl BrokerSlot {
    pub fn set(&self, broker: Arc<dyn Broker>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(broker);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The broker, if one is set and its connection is still up.
    pub fn current(&self) -> Option<Arc<dyn Broker>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|b| b.is_connected())
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/messages",
            get(crate::http::messages::list_handler).post(crate::http::messages::submit_handler),
        )
        .route("/api/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        // dashboards are served from a different origin
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
