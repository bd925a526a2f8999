//! WebSocket reflector connector.
//!
//! A reflector is a relay that re-broadcasts text frames between every
//! client attached to it, turning N sockets into one shared bus. This crate
//! is the client side of that link: text frames map 1:1 to bus payloads,
//! binary frames are dropped, ping/pong is handled by the websocket layer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use warplink_core::Payload;

/// Errors on the reflector link.
#[derive(Debug, thiserror::Error)]
pub enum ReflectorError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Client side of a reflector connection.
pub struct ReflectorClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ReflectorClient {
    /// Connect to a reflector, e.g. `ws://localhost:9400`.
    pub async fn connect(url: &str) -> Result<Self, ReflectorError> {
        let (stream, _) = connect_async(url).await?;
        tracing::debug!(url, "reflector connected");
        Ok(Self { stream })
    }

    /// Publish one payload as a text frame. Fire-and-forget at the protocol
    /// level; transport errors still surface.
    pub async fn publish(&mut self, payload: &Payload) -> Result<(), ReflectorError> {
        let text = match payload {
            Payload::Text(text) => text.clone(),
            Payload::Object(value) => value.to_string(),
        };
        self.stream.send(WsMessage::Text(text.into())).await?;
        Ok(())
    }

    /// Next payload from the reflector, or `None` when the link closes.
    pub async fn recv(&mut self) -> Result<Option<Payload>, ReflectorError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                WsMessage::Text(text) => return Ok(Some(Payload::Text(text.as_str().to_owned()))),
                WsMessage::Close(_) => return Ok(None),
                // Anything else on the wire is not bus traffic.
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Close the link cleanly.
    pub async fn close(&mut self) -> Result<(), ReflectorError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
