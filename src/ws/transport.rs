use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Opens duplex channels to the device bridge
#[async_trait]
pub trait Connector: Send {
    type Channel: Channel;

    async fn connect(&mut self) -> Result<Self::Channel>;
}

/// An open duplex text channel.
///
/// `recv_text` must be cancel safe: the connection manager polls it inside
/// `tokio::select!` alongside the tick timer and the command queue.
#[async_trait]
pub trait Channel: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next text frame, `None` once the peer closed the channel
    async fn recv_text(&mut self) -> Option<Result<String>>;
}

/// WebSocket connector for `ws://` and `wss://` endpoints
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&mut self) -> Result<WsChannel> {
        let (stream, _response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| AppError::Channel(format!("connection failed: {}", e)))?;
        info!(endpoint = %self.endpoint, "WebSocket connection established");
        Ok(WsChannel { stream })
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| AppError::Channel(format!("send failed: {}", e)))
    }

    async fn recv_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    info!(?frame, "WebSocket closed by server");
                    return None;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    debug!("WebSocket keepalive");
                }
                Ok(Message::Binary(_)) => {
                    warn!("Received unexpected binary frame");
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(AppError::Channel(e.to_string()))),
            }
        }
    }
}
