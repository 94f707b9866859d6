use std::time::Duration;

use serde::Deserialize;
use gimptrack_core::error::{Result, TrackerError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub version: u32,

    pub collector: CollectorSection,

    #[serde(default)]
    pub send: SendToggles,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TrackerError::UnsupportedVersion);
        }

        // The URL itself is checked at connect time and surfaces as BAD_URL.
        self.collector.validate()?;

        Ok(())
    }
}

/// Which transport a session may use, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Websocket,
    Polling,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorSection {
    pub url: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_true")]
    pub connect_on_login: bool,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "default_teardown_timeout_ms")]
    pub teardown_timeout_ms: u64,

    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl CollectorSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=60000).contains(&self.handshake_timeout_ms) {
            return Err(TrackerError::BadRequest(
                "collector.handshake_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(100..=30000).contains(&self.teardown_timeout_ms) {
            return Err(TrackerError::BadRequest(
                "collector.teardown_timeout_ms must be between 100 and 30000".into(),
            ));
        }
        if !(50..=10000).contains(&self.poll_interval_ms) {
            return Err(TrackerError::BadRequest(
                "collector.poll_interval_ms must be between 50 and 10000".into(),
            ));
        }
        if self.transports.is_empty() {
            return Err(TrackerError::BadRequest(
                "collector.transports must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Per-category send switches. The host consults these; the packet builder
/// never does.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendToggles {
    #[serde(default = "default_true")]
    pub data: bool,
    #[serde(default = "default_true")]
    pub inventory: bool,
    #[serde(default = "default_true")]
    pub skills: bool,
    #[serde(default = "default_true")]
    pub equipment: bool,
    #[serde(default = "default_true")]
    pub health: bool,
    #[serde(default = "default_true")]
    pub prayer: bool,
    #[serde(default = "default_true")]
    pub energy: bool,
}

impl Default for SendToggles {
    fn default() -> Self {
        Self {
            data: true,
            inventory: true,
            skills: true,
            equipment: true,
            health: true,
            prayer: true,
            energy: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_handshake_timeout_ms() -> u64 {
    10000
}
fn default_teardown_timeout_ms() -> u64 {
    3000
}
fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}
fn default_poll_interval_ms() -> u64 {
    500
}
