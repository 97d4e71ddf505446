use crate::error::TransportError;
use crate::signaling::signal_sink::SignalSink;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use relaycast_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Websocket connection to the relay.
///
/// Inbound frames are parsed and handed out through the receiver returned by
/// [`connect`](Self::connect). When the socket closes that receiver ends, and
/// every later [`send`](SignalSink::send) fails with
/// [`TransportError::Closed`].
#[derive(Clone)]
pub struct SignalClient {
    outgoing: mpsc::UnboundedSender<SignalMessage>,
}

impl SignalClient {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SignalMessage>), TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        info!("Connected to relay at {}", url);

        let (mut ws_sender, mut ws_receiver) = stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize signal message: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = ws_receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(parsed) => {
                            if incoming_tx.send(parsed).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Malformed frame from relay: {}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        // Either half ending takes the other one down.
        tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            debug!("Relay connection closed");
        });

        Ok((
            Self {
                outgoing: outgoing_tx,
            },
            incoming_rx,
        ))
    }
}

#[async_trait]
impl SignalSink for SignalClient {
    async fn send(&self, msg: SignalMessage) -> Result<(), TransportError> {
        self.outgoing.send(msg).map_err(|_| TransportError::Closed)
    }
}
