//! Top-level facade crate for gimptrack.
//!
//! Re-exports the core types and the client library so hosts can depend on a single crate.

pub mod core {
    pub use gimptrack_core::*;
}

pub mod client {
    pub use gimptrack_client::*;
}
