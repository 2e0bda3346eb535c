// WebSocket client for talking to the duel relay.
//
// A thin async wrapper over a tokio-tungstenite client stream that speaks the
// relay protocol: `send` encodes a `ClientMessage` as one JSON text frame, and
// `recv` decodes the next text frame as a `ServerMessage`. Pings and other
// control frames are handled by tungstenite and never surface here.
//
// The relay itself never uses this module. It exists for integration tests,
// bots and tools that need to drive a session from Rust. Reads are pulled on
// demand rather than pumped by a background task, so a caller that stops
// reading simply leaves frames queued in the socket.

use std::time::Duration;

use duel_protocol::{ClientMessage, DecodeError, ServerMessage, decode_server, encode};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to decode relay message: {0}")]
    Decode(#[from] DecodeError),
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(e))
    }
}

/// Client connection to a relay.
pub struct DuelClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl DuelClient {
    /// Open a WebSocket to `url`, e.g. `ws://127.0.0.1:8081/ws`. Fails if
    /// the relay refuses the upgrade (wrong path) or is unreachable.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send one protocol message.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let text = encode(msg)?;
        self.send_raw(&text).await
    }

    /// Send an arbitrary text frame, valid protocol or not.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ClientError> {
        self.ws.send(Message::text(text)).await?;
        Ok(())
    }

    /// Wait for the next relay message. Returns `Ok(None)` once the relay has
    /// closed the connection.
    pub async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        while let Some(frame) = self.ws.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(decode_server(text.as_str())?)),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Like `recv`, but gives up after `timeout`. Both a timeout and a closed
    /// connection yield `Ok(None)`.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ServerMessage>, ClientError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(None),
        }
    }

    /// Collect every message that arrives before the relay goes quiet for
    /// `quiet`. Stops early on close or error.
    pub async fn drain(&mut self, quiet: Duration) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Some(msg)) = self.recv_timeout(quiet).await {
            messages.push(msg);
        }
        messages
    }

    /// Send a close frame and wait for the relay to acknowledge it.
    pub async fn close(mut self) -> Result<(), ClientError> {
        match self.ws.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => {}
            Err(e) => return Err(e.into()),
        }
        while let Some(Ok(_)) = self.ws.next().await {}
        Ok(())
    }
}
