use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use relaycast_core::{PeerId, Role, RoomId, SignalData, SignalMessage};
use relaycast_server::{Relay, RelayConfig, router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::SIGNAL_TIMEOUT_MS;

/// Binds a relay on an ephemeral port and serves it in the background.
pub async fn spawn_relay() -> Result<(Relay, SocketAddr)> {
    let relay = Relay::new(&RelayConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = router(relay.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((relay, addr))
}

/// A bare websocket client speaking the relay protocol.
pub struct TestWsClient {
    pub peer_id: PeerId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    /// Connects and consumes the welcome and ICE config frames.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .context("Failed to connect to relay")?;

        let mut client = Self {
            peer_id: PeerId::new(),
            stream,
        };

        match client.recv().await? {
            SignalMessage::Welcome { peer_id } => client.peer_id = peer_id,
            other => anyhow::bail!("expected welcome, got {other:?}"),
        }
        match client.recv().await? {
            SignalMessage::IceConfig { .. } => {}
            other => anyhow::bail!("expected ice config, got {other:?}"),
        }

        Ok(client)
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_owned().into())).await?;
        Ok(())
    }

    pub async fn join(&mut self, role: Role, room: &str) -> Result<()> {
        self.send(&SignalMessage::Join {
            role,
            room_id: RoomId::from(room),
        })
        .await
    }

    pub async fn signal(
        &mut self,
        room: &str,
        viewer_id: Option<PeerId>,
        data: SignalData,
    ) -> Result<()> {
        self.send(&SignalMessage::signal(RoomId::from(room), viewer_id, data))
            .await
    }

    pub async fn recv(&mut self) -> Result<SignalMessage> {
        loop {
            let frame = tokio::time::timeout(
                Duration::from_millis(SIGNAL_TIMEOUT_MS),
                self.stream.next(),
            )
            .await
            .context("Timeout waiting for a frame")?
            .context("Relay closed the connection")??;

            if let Message::Text(text) = frame {
                return Ok(serde_json::from_str(&text)?);
            }
        }
    }

    /// `None` if nothing arrives within a short window.
    pub async fn try_recv(&mut self, window_ms: u64) -> Option<SignalMessage> {
        let frame = tokio::time::timeout(Duration::from_millis(window_ms), self.stream.next())
            .await
            .ok()??
            .ok()?;
        match frame {
            Message::Text(text) => serde_json::from_str(&text).ok(),
            _ => None,
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
