use crate::relay::Relay;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use relaycast_core::SignalMessage;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Relay>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: Relay) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let peer_id = relay.connect(tx);
    info!(%peer_id, "new websocket connection");

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = relay.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(signal) => relay.handle_message(peer_id, signal).await,
                        Err(e) => warn!(%peer_id, "invalid signal message: {}", e),
                    },
                    Message::Binary(_) => warn!(%peer_id, "binary frames are not supported"),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    relay.disconnect(peer_id).await;
}
