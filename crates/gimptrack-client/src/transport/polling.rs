//! HTTP long-polling transport (fallback when the stream upgrade fails).
//!
//! Collector contract:
//! - `POST <endpoint>/poll?ticket=..` opens a session and answers `{"sid": ".."}`
//! - `GET  <endpoint>/poll/<sid>` long-polls and answers a JSON array of envelopes
//! - `POST <endpoint>/poll/<sid>` delivers one envelope
//! - `DELETE <endpoint>/poll/<sid>` closes the session
//!
//! 404/410 on a session URL means the collector dropped the session.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use gimptrack_core::error::{Result, TrackerError};

use crate::transport::{Connector, Endpoint, Link};

#[derive(Debug, Clone)]
pub struct PollingConnector {
    client: Client,
    interval: Duration,
}

impl PollingConnector {
    pub fn new(interval: Duration) -> Self {
        Self {
            client: Client::new(),
            interval,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    sid: String,
}

fn transport_err(e: reqwest::Error) -> TrackerError {
    TrackerError::Transport(format!("polling: {e}"))
}

fn check_status(status: StatusCode) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TrackerError::AuthFailed);
    }
    if !status.is_success() {
        return Err(TrackerError::Transport(format!("polling: http {status}")));
    }
    Ok(())
}

/// Split a poll response body into individual text frames.
pub fn decode_batch(body: Bytes) -> Result<Vec<String>> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let frames: Vec<Value> = serde_json::from_slice(&body)
        .map_err(|e| TrackerError::BadRequest(format!("invalid poll batch: {e}")))?;
    Ok(frames.into_iter().map(|f| f.to_string()).collect())
}

#[async_trait]
impl Connector for PollingConnector {
    fn name(&self) -> &'static str {
        "polling"
    }

    async fn open(&self, endpoint: &Endpoint, credential: &str) -> Result<Box<dyn Link>> {
        let url = endpoint.poll_url(credential)?;
        let resp = self.client.post(url.clone()).send().await.map_err(transport_err)?;
        check_status(resp.status())?;
        let open: OpenResponse = resp.json().await.map_err(transport_err)?;

        let mut session_url = url;
        session_url.set_query(None);
        session_url
            .path_segments_mut()
            .map_err(|_| TrackerError::BadUrl("endpoint cannot carry a path".into()))?
            .push(&open.sid);

        tracing::debug!(sid = %open.sid, "polling session opened");
        Ok(Box::new(PollingLink::start(self.client.clone(), session_url, self.interval)))
    }
}

/// Inbound frames come from a poller task spawned at open, so `recv` only
/// waits on a channel and a cancelled `recv` never drops a poll response.
pub struct PollingLink {
    client: Client,
    session_url: Url,
    inbound: mpsc::UnboundedReceiver<Result<String>>,
    poller: JoinHandle<()>,
}

impl PollingLink {
    fn start(client: Client, session_url: Url, interval: Duration) -> Self {
        let (tx, inbound) = mpsc::unbounded_channel();
        let poller = tokio::spawn(poll_loop(client.clone(), session_url.clone(), interval, tx));
        Self {
            client,
            session_url,
            inbound,
            poller,
        }
    }
}

/// Long-poll until the collector drops the session, a request fails, or the
/// link goes away. Dropping `tx` reads as a closed link.
async fn poll_loop(
    client: Client,
    session_url: Url,
    interval: Duration,
    tx: mpsc::UnboundedSender<Result<String>>,
) {
    loop {
        let frames = match poll_once(&client, &session_url).await {
            Ok(Some(frames)) => frames,
            Ok(None) => {
                tracing::debug!(url = %session_url, "polling session gone");
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        };

        if frames.is_empty() {
            tokio::time::sleep(interval).await;
        }
        for frame in frames {
            if tx.send(Ok(frame)).is_err() {
                return;
            }
        }
        if tx.is_closed() {
            return;
        }
    }
}

/// One GET; `None` once the collector has dropped the session.
async fn poll_once(client: &Client, session_url: &Url) -> Result<Option<Vec<String>>> {
    let resp = client
        .get(session_url.clone())
        .send()
        .await
        .map_err(transport_err)?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Ok(None);
    }
    check_status(status)?;
    let body = resp.bytes().await.map_err(transport_err)?;
    decode_batch(body).map(Some)
}

impl Drop for PollingLink {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[async_trait]
impl Link for PollingLink {
    fn transport(&self) -> &'static str {
        "polling"
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        let resp = self
            .client
            .post(self.session_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(frame)
            .send()
            .await
            .map_err(transport_err)?;
        check_status(resp.status())
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        match self.inbound.recv().await {
            Some(frame) => frame.map(Some),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.poller.abort();
        let resp = self
            .client
            .delete(self.session_url.clone())
            .send()
            .await
            .map_err(transport_err)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(());
        }
        check_status(status)
    }
}
