use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::AppState;

/// Upgrades GET /ws to a WebSocket subscriber.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection loop: drain the subscriber queue into the socket until
/// either side goes away or the gateway shuts down.
///
/// The connection is receive-only from the client's point of view; inbound
/// text frames are ignored.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let mut sub = state.relay.subscribe();
    let conn_id = sub.id.clone();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            frame = sub.frames.recv() => {
                // None: the hub dropped us (slow or failed consumer)
                let Some(frame) = frame else { break };
                if tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => debug!(conn_id = %conn_id, "ignoring inbound frame"),
                }
            }

            _ = state.shutdown.cancelled() => {
                let _ = tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.relay.unsubscribe(&conn_id);
    info!(conn_id = %conn_id, "WS connection closed");
}
