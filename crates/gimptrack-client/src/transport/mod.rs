//! Transport layer (WebSocket stream, HTTP long-polling fallback).
//!
//! The session manager talks to a [`Connector`] and the [`Link`] it opens and
//! never cares which concrete transport is underneath. Fallback order lives
//! here, not in the session.

pub mod codec;
pub mod fallback;
pub mod polling;
pub mod ws;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use gimptrack_core::error::{Result, TrackerError};

use crate::config::{CollectorSection, TransportKind};

pub use fallback::FallbackConnector;
pub use polling::PollingConnector;
pub use ws::WsConnector;

/// Opens links to the collector.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open a link, presenting `credential` during the handshake.
    async fn open(&self, endpoint: &Endpoint, credential: &str) -> Result<Box<dyn Link>>;
}

/// A live bidirectional text-frame link.
///
/// `recv` must be cancel-safe: the session polls it inside `tokio::select!`.
#[async_trait]
pub trait Link: Send {
    fn transport(&self) -> &'static str;

    async fn send(&mut self, frame: String) -> Result<()>;

    /// Next inbound text frame; `None` once the peer has closed.
    async fn recv(&mut self) -> Result<Option<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Validated collector endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| TrackerError::BadUrl(format!("{raw}: {e}")))?;
        match url.scheme() {
            "ws" | "wss" | "http" | "https" => {}
            other => return Err(TrackerError::BadUrl(format!("unsupported scheme: {other}"))),
        }
        if url.host_str().is_none() {
            return Err(TrackerError::BadUrl(format!("{raw}: missing host")));
        }
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    fn is_secure(&self) -> bool {
        matches!(self.url.scheme(), "wss" | "https")
    }

    /// WebSocket URL carrying the credential as `ticket`.
    pub fn stream_url(&self, credential: &str) -> Result<Url> {
        let scheme = if self.is_secure() { "wss" } else { "ws" };
        self.with_ticket(scheme, None, credential)
    }

    /// Long-polling handshake URL (`<path>/poll?ticket=..`).
    pub fn poll_url(&self, credential: &str) -> Result<Url> {
        let scheme = if self.is_secure() { "https" } else { "http" };
        self.with_ticket(scheme, Some("poll"), credential)
    }

    fn with_ticket(&self, scheme: &str, segment: Option<&str>, credential: &str) -> Result<Url> {
        let mut url = self.url.clone();
        url.set_scheme(scheme)
            .map_err(|_| TrackerError::BadUrl(format!("cannot switch scheme to {scheme}")))?;
        if let Some(segment) = segment {
            url.path_segments_mut()
                .map_err(|_| TrackerError::BadUrl("endpoint cannot carry a path".into()))?
                .pop_if_empty()
                .push(segment);
        }
        url.query_pairs_mut().append_pair("ticket", credential);
        Ok(url)
    }
}

/// Build the connector chain described by the collector config.
pub fn from_config(cfg: &CollectorSection) -> FallbackConnector {
    let chain: Vec<Arc<dyn Connector>> = cfg
        .transports
        .iter()
        .map(|kind| -> Arc<dyn Connector> {
            match kind {
                TransportKind::Websocket => Arc::new(WsConnector::new()),
                TransportKind::Polling => Arc::new(PollingConnector::new(cfg.poll_interval())),
            }
        })
        .collect();
    FallbackConnector::new(chain)
}
