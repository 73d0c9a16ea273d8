use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use flarego_model::Chunk;
use futures_util::{SinkExt, StreamExt};

use crate::errors::GatewayError;
use crate::state::GatewayState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Producer-ingress endpoint: one WebSocket per connected producer,
/// carrying binary-framed JSON chunks.
pub async fn ingress_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    state.auth.authenticate(bearer_token(&headers))?;
    Ok(ws.on_upgrade(move |socket| handle_ingress(socket, state)))
}

async fn handle_ingress(socket: WebSocket, state: GatewayState) {
    let (_sender, mut receiver) = socket.split();
    while let Some(message) = receiver.next().await {
        let bytes = match message {
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(error = %err, "ingress stream ended");
                break;
            }
        };
        process_chunk(&state, bytes).await;
    }
}

/// One received chunk: retained, fanned out, and fed to the alert runtime.
/// Neither a retention-store error nor a subscriber drop may propagate back
/// to the ingress stream.
async fn process_chunk(state: &GatewayState, bytes: Vec<u8>) {
    if let Err(err) = state.retention.write(bytes.clone()).await {
        tracing::warn!(error = %err, "retention write failed");
    }
    state.fanout.broadcast(&bytes);

    match Chunk::from_bytes(bytes).decode() {
        Ok(snapshot) => {
            for rule_name in state.alerts.on_chunk(&snapshot) {
                tracing::info!(rule = %rule_name, "alert rule fired");
            }
        }
        Err(err) => tracing::warn!(error = %err, "malformed chunk, skipping alert evaluation"),
    }
}
