//! Wire envelopes exchanged with the collector.
//!
//! Every frame is a JSON text envelope `{"v":1,"svc":..,"type":..,"data":..}`.
//! Tracker packets travel under `svc = "tracker"`; the collector answers the
//! handshake with `svc = "sys"` frames. Decoding is panic-free: malformed
//! input is reported as `TrackerError`.

pub mod sys;
pub mod text;

pub use sys::SysFrame;
pub use text::{Envelope, TrackerEvent, PROTOCOL_VERSION};
