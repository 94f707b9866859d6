//! Collector control frames (`svc = "sys"`).

use serde_json::json;

use crate::error::{ClientCode, TrackerError};
use crate::protocol::text::{Envelope, SVC_SYS};

/// Control frame as seen by a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysFrame {
    /// Credential accepted.
    Authed { user: Option<String> },
    /// Collector-side failure; `code` uses [`ClientCode`] strings.
    Error { code: String, msg: String },
}

impl SysFrame {
    /// Classify an envelope. Non-`sys` or unknown `sys` types yield `None`.
    pub fn from_envelope(env: &Envelope) -> Option<Self> {
        if env.svc != SVC_SYS {
            return None;
        }
        let data = env.data.as_ref();
        let str_field = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        };
        match env.msg_type.as_str() {
            "authed" => Some(SysFrame::Authed {
                user: str_field("user"),
            }),
            "error" => Some(SysFrame::Error {
                code: str_field("code").unwrap_or_default(),
                msg: str_field("msg").unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Error implied by this frame, if any.
    pub fn as_error(&self) -> Option<TrackerError> {
        match self {
            SysFrame::Authed { .. } => None,
            SysFrame::Error { code, .. } if code == ClientCode::AuthFailed.as_str() => {
                Some(TrackerError::AuthFailed)
            }
            SysFrame::Error { code, msg } => Some(TrackerError::Transport(format!(
                "collector error {code}: {msg}"
            ))),
        }
    }

    pub fn into_envelope(self) -> Envelope {
        match self {
            SysFrame::Authed { user } => Envelope::new(SVC_SYS, "authed", Some(json!({ "user": user }))),
            SysFrame::Error { code, msg } => Envelope::new(
                SVC_SYS,
                "error",
                Some(json!({
                    "code": code,
                    "msg": msg
                })),
            ),
        }
    }
}
