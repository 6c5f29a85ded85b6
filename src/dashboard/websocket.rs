use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use super::state::DashboardState;

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<DashboardState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One connection: forward broadcast `ChatEvent`s as JSON until the client
/// goes away. A lagging subscriber is dropped rather than blocking the
/// channel.
async fn handle_socket(socket: WebSocket, state: Arc<DashboardState>) {
    let mut event_rx = state.event_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Ok(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
