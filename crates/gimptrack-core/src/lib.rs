//! gimptrack core: transport-agnostic record assembly, wire envelopes, and
//! session status types.
//!
//! This crate defines the outbound record, the change-driven packet builder,
//! and the error surface shared by the client and any collector tooling. It
//! carries no runtime or transport dependencies so the builder can be driven
//! from any host tick loop.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Fallible paths
//! surface as `TrackerError`/`Result`, and poisoned locks are recovered rather
//! than propagated, so a misbehaving host thread cannot take the tracker down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod packet;
pub mod protocol;
pub mod record;
pub mod status;

/// Shared result type.
pub use error::{Result, TrackerError};
pub use packet::{Flush, PacketBuilder};
pub use record::{Field, FieldSet, FieldValue, ItemStack, LootEvent, LootKind, SkillXp};
pub use status::{AuthState, ConnectionState};
