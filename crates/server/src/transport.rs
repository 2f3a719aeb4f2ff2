//! [`SessionTransport`] over an axum WebSocket.

use crate::protocol::ServerMessage;
use crate::session::SessionTransport;
use axum::extract::ws::{Message, WebSocket};
use sift_core::{AppError, AppResult};

pub struct WsTransport {
    socket: WebSocket,
    closed: bool,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

#[async_trait::async_trait]
impl SessionTransport for WsTransport {
    async fn receive(&mut self) -> AppResult<Option<String>> {
        if self.closed {
            return Ok(None);
        }

        while let Some(message) = self.socket.recv().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Binary(bytes)) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Peer sent close frame");
                    self.closed = true;
                    return Ok(None);
                }
                Err(e) => {
                    // A reset without a closing handshake still means the peer is gone.
                    tracing::debug!(error = %e, "WebSocket receive failed");
                    self.closed = true;
                    return Ok(None);
                }
            }
        }

        self.closed = true;
        Ok(None)
    }

    async fn send(&mut self, message: &ServerMessage) -> AppResult<()> {
        if self.closed {
            return Err(AppError::PeerDisconnected);
        }

        let json = serde_json::to_string(message)?;
        if let Err(e) = self.socket.send(Message::Text(json.into())).await {
            tracing::debug!(error = %e, "WebSocket send failed");
            self.closed = true;
            return Err(AppError::PeerDisconnected);
        }
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| AppError::Transport(format!("WebSocket close failed: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
