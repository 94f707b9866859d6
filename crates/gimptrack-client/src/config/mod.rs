//! Tracker config loader (strict parsing).

pub mod schema;

use std::fs;

use gimptrack_core::error::{Result, TrackerError};

pub use schema::{CollectorSection, SendToggles, SessionConfig, TransportKind};

pub fn load_from_file(path: &str) -> Result<SessionConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TrackerError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SessionConfig> {
    let cfg: SessionConfig = serde_yaml::from_str(s)
        .map_err(|e| TrackerError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
