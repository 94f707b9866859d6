//! Change-driven packet assembly.
//!
//! `PacketBuilder` owns the single live [`OutboundRecord`]. Hosts write fields
//! as they observe deltas; the session layer asks [`PacketBuilder::is_sendable`]
//! before flushing. The builder never looks at send toggles: it tracks exactly
//! the fields it is told about.
//!
//! All methods take `&self`. The live record sits behind a mutex so a host
//! sampling thread and a flushing thread never observe a half-written record.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::record::{FieldSet, FieldValue, LootEvent, OutboundRecord};

/// Result of [`PacketBuilder::finalize_and_reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Flush {
    /// Serialized record; `None` when nothing changed since the last flush.
    pub payload: Option<Value>,
    /// Fields carried by `payload`.
    pub fields: FieldSet,
}

impl Flush {
    pub fn was_changed(&self) -> bool {
        self.payload.is_some()
    }
}

#[derive(Debug, Default)]
struct Live {
    goal: FieldSet,
    record: OutboundRecord,
}

#[derive(Debug, Default)]
pub struct PacketBuilder {
    live: Mutex<Live>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Live> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the goal. Already written fields stay written.
    pub fn set_goal(&self, goal: FieldSet) {
        self.lock().goal = goal;
    }

    pub fn goal(&self) -> FieldSet {
        self.lock().goal
    }

    /// Fields written since the last flush.
    pub fn changed(&self) -> FieldSet {
        self.lock().record.changed()
    }

    /// Write one field. Repeated writes before a flush keep the latest value.
    pub fn set_field(&self, value: FieldValue) {
        self.lock().record.apply(value);
    }

    /// Append a loot drop; drops accumulate until the next flush.
    pub fn append_loot(&self, event: LootEvent) {
        self.lock().record.push_loot(event);
    }

    pub fn is_sendable(&self) -> bool {
        let live = self.lock();
        live.goal.is_subset(live.record.changed())
    }

    /// Serialize the live record and start a new one.
    ///
    /// The fresh record keeps the current goal minus the mandatory identity
    /// fields; those come back only through an explicit full snapshot.
    /// Heartbeat ticks with no writes produce no payload and leave the live
    /// record untouched.
    pub fn finalize_and_reset(&self) -> Flush {
        let mut live = self.lock();
        let fields = live.record.changed();
        if fields.is_empty() {
            return Flush {
                payload: None,
                fields,
            };
        }

        let record = std::mem::take(&mut live.record);
        live.goal = live.goal - FieldSet::MANDATORY;
        tracing::trace!(?fields, goal = ?live.goal, "packet finalized");

        Flush {
            payload: Some(record.to_json()),
            fields,
        }
    }

    /// Drop everything, goal included. Used when a session ends so the next
    /// one starts from a clean full snapshot.
    pub fn reset(&self) {
        *self.lock() = Live::default();
    }
}
