//! Decode-once codec for inbound collector frames.
//!
//! - `sys` frames => [`SysFrame`] (handshake outcome, collector errors)
//! - everything else is surfaced as a plain envelope and ignored upstream

use gimptrack_core::{
    error::Result,
    protocol::{Envelope, SysFrame},
};

#[derive(Debug)]
pub enum Inbound {
    Sys(SysFrame),
    Other(Envelope),
}

pub fn decode(text: &str) -> Result<Inbound> {
    let env = Envelope::decode(text)?;
    Ok(match SysFrame::from_envelope(&env) {
        Some(frame) => Inbound::Sys(frame),
        None => Inbound::Other(env),
    })
}
