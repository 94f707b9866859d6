//! Text envelope (JSON).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrackerError};

pub const PROTOCOL_VERSION: u8 = 1;

/// Service name for outbound tracker packets.
pub const SVC_TRACKER: &str = "tracker";
/// Service name for collector control frames.
pub const SVC_SYS: &str = "sys";

/// The two packet kinds a tracker emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    /// First packet of an authorized session; carries the full snapshot.
    Connect,
    /// Every later packet; carries only fields changed since the last one.
    Update,
}

impl TrackerEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerEvent::Connect => "connect",
            TrackerEvent::Update => "update",
        }
    }

    pub fn for_first_packet(first: bool) -> Self {
        if first {
            TrackerEvent::Connect
        } else {
            TrackerEvent::Update
        }
    }
}

/// Text frame envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Service name (`tracker` or `sys`).
    pub svc: String,
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Feature flags bitmask.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub flags: u32,
    /// Optional sequence number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Optional payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl Envelope {
    pub fn new(svc: impl Into<String>, msg_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            svc: svc.into(),
            msg_type: msg_type.into(),
            flags: 0,
            seq: None,
            data,
        }
    }

    /// Tracker packet carrying a serialized record.
    pub fn tracker(event: &str, record: Value) -> Self {
        Self::new(SVC_TRACKER, event, Some(record))
    }

    pub fn is_tracker(&self) -> bool {
        self.svc == SVC_TRACKER
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TrackerError::Internal(format!("json encode failed: {e}")))
    }

    /// Parse and version-check one text frame.
    pub fn decode(s: &str) -> Result<Self> {
        let env: Envelope = serde_json::from_str(s)
            .map_err(|e| TrackerError::BadRequest(format!("invalid envelope json: {e}")))?;
        if env.v != PROTOCOL_VERSION {
            return Err(TrackerError::UnsupportedVersion);
        }
        Ok(env)
    }
}
