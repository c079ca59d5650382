//! WebSocket transport for the telemetry feed

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{RagstreamError, Result};
use crate::telemetry::client::{TelemetryConnection, TelemetryConnector};

/// Connects over `ws://` or `wss://`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl TelemetryConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn TelemetryConnection>> {
        let (stream, response) = connect_async(url).await.map_err(RagstreamError::from)?;
        tracing::debug!(url = %url, status = response.status().as_u16(), "WebSocket handshake complete");
        Ok(Box::new(WsConnection { stream }))
    }
}

/// Open WebSocket connection
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TelemetryConnection for WsConnection {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(RagstreamError::from)?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => tracing::warn!(error = %e, "Skipping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Server closed telemetry socket");
                    return None;
                }
                // Ping/pong are answered by tungstenite itself
                Ok(_) => {}
                Err(e) => return Some(Err(RagstreamError::from(e).into())),
            }
        }
    }
}
