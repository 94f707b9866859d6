//! Tracker client: session lifecycle, transports and the host-side driver.
//!
//! - [`session::SessionManager`] owns the connection to the collector and
//!   reports connection/auth state to listeners.
//! - [`transport`] holds the websocket and long-polling links plus the
//!   fallback chain the session opens through.
//! - [`tracker::Tracker`] samples the host every tick and feeds the
//!   packet builder.

pub mod config;
pub mod feed;
pub mod session;
pub mod tracker;
pub mod transport;
