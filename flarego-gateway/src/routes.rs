use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tower_http::trace::TraceLayer;

use crate::ingress::ingress_handler;
use crate::state::GatewayState;

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/ingress", get(ingress_handler))
        .route("/subscribe", get(subscribe_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// UI-subscriber endpoint: retained history first, then live chunks.
async fn subscribe_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| handle_subscribe(socket, state))
}

async fn handle_subscribe(socket: WebSocket, state: GatewayState) {
    let Some(mut handle) = state.fanout.register() else {
        // Soft cap reached: close immediately rather than grow unbounded.
        let _ = socket.close().await;
        return;
    };

    let (mut sender, mut receiver) = socket.split();

    match state.retention.read_all().await {
        Ok(history) => {
            for chunk in history {
                if sender.send(Message::Binary(chunk.bytes.into())).await.is_err() {
                    state.fanout.unregister(handle.id);
                    return;
                }
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to replay retained history"),
    }

    loop {
        tokio::select! {
            live = handle.receiver.recv() => {
                match live {
                    Some(bytes) => {
                        if sender.send(Message::Binary(bytes.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.fanout.unregister(handle.id);
}
