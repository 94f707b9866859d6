//! WebSocket transport (preferred).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, http::StatusCode, Message},
    MaybeTlsStream, WebSocketStream,
};

use gimptrack_core::error::{Result, TrackerError};

use crate::transport::{Connector, Endpoint, Link};

#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

fn map_ws_err(e: tungstenite::Error) -> TrackerError {
    match e {
        tungstenite::Error::Http(resp)
            if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN =>
        {
            TrackerError::AuthFailed
        }
        tungstenite::Error::Url(u) => TrackerError::BadUrl(u.to_string()),
        other => TrackerError::Transport(format!("websocket: {other}")),
    }
}

#[async_trait]
impl Connector for WsConnector {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn open(&self, endpoint: &Endpoint, credential: &str) -> Result<Box<dyn Link>> {
        let url = endpoint.stream_url(credential)?;
        let (stream, resp) = connect_async(url.as_str()).await.map_err(map_ws_err)?;
        tracing::debug!(status = %resp.status(), "websocket upgraded");
        Ok(Box::new(WsLink { stream }))
    }
}

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    fn transport(&self) -> &'static str {
        "websocket"
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        self.stream.send(Message::Text(frame)).await.map_err(map_ws_err)
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        while let Some(msg) = self.stream.next().await {
            match msg.map_err(map_ws_err)? {
                Message::Text(s) => return Ok(Some(s)),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings on the next read/write.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                Message::Binary(b) => {
                    tracing::debug!(len = b.len(), "binary frame ignored");
                }
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_ws_err(e)),
        }
    }
}
