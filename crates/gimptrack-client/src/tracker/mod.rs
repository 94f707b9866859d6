//! Host-side driver: turns host samples into packets and packets into sends.
//!
//! Per tick the tracker
//! 1. writes a full snapshot if one was requested (authorization does this),
//! 2. flushes the live packet when the session is connected, authorized and
//!    the packet goal is met (`connect` for the first packet, `update` after),
//! 3. writes position and vitals that changed since the previous tick.
//!
//! Send toggles are applied here; the packet builder never sees them.

mod host;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gimptrack_core::{
    protocol::TrackerEvent, AuthState, ConnectionState, Field, FieldSet, FieldValue, ItemStack, LootEvent,
    PacketBuilder,
};

use crate::config::{SendToggles, SessionConfig};
use crate::session::{ConnectionListener, SessionManager};

pub use host::{HostEvent, HostState, WorldPoint};

/// Session-side signals, raised on the transport thread and consumed on the
/// next tick.
struct SessionSignals {
    builder: Arc<PacketBuilder>,
    full_snapshot: AtomicBool,
}

impl ConnectionListener for SessionSignals {
    fn on_connection_status_changed(&self, status: ConnectionState) {
        // Next session starts over from a full snapshot.
        if status == ConnectionState::Disconnected {
            self.full_snapshot.store(false, Ordering::SeqCst);
            self.builder.reset();
        }
    }

    fn on_connection_error_changed(&self, error: AuthState) {
        if error == AuthState::Authorized {
            self.full_snapshot.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Previous {
    tile: WorldPoint,
    health: i32,
    prayer: i32,
    energy: i32,
}

impl Default for Previous {
    fn default() -> Self {
        Self {
            tile: WorldPoint::default(),
            health: 99,
            prayer: 99,
            energy: 100,
        }
    }
}

pub struct Tracker {
    session: SessionManager,
    builder: Arc<PacketBuilder>,
    signals: Arc<SessionSignals>,
    toggles: SendToggles,
    connect_on_login: bool,
    previous: Previous,
    ticks_since_login: Option<u32>,
}

impl Tracker {
    pub fn new(session: SessionManager, toggles: SendToggles, connect_on_login: bool) -> Self {
        let builder = Arc::new(PacketBuilder::new());
        let signals = Arc::new(SessionSignals {
            builder: Arc::clone(&builder),
            full_snapshot: AtomicBool::new(false),
        });
        session.add_connection_listener(signals.clone());

        Self {
            session,
            builder,
            signals,
            toggles,
            connect_on_login,
            previous: Previous::default(),
            ticks_since_login: None,
        }
    }

    pub fn from_config(session: SessionManager, cfg: &SessionConfig) -> Self {
        Self::new(session, cfg.send, cfg.collector.connect_on_login)
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn builder(&self) -> &PacketBuilder {
        &self.builder
    }

    pub fn set_toggles(&mut self, toggles: SendToggles) {
        self.toggles = toggles;
    }

    /// Ask for a full snapshot on the next tick.
    pub fn request_full_snapshot(&self) {
        self.signals.full_snapshot.store(true, Ordering::SeqCst);
    }

    /// One host tick.
    pub fn on_tick(&mut self, host: &impl HostState) {
        if self.signals.full_snapshot.swap(false, Ordering::SeqCst) {
            self.queue_full_packet(host);
        }

        if self.toggles.data && self.session.is_connected() && self.session.is_authorized() {
            self.update_client(self.session.is_first_packet());
        }

        match self.ticks_since_login {
            Some(n) if n >= 1 => {
                self.ticks_since_login = None;
                self.post_login();
            }
            Some(n) => self.ticks_since_login = Some(n + 1),
            None => {}
        }

        self.sample_deltas(host);
    }

    fn sample_deltas(&mut self, host: &impl HostState) {
        let tile = host.position();
        if tile != self.previous.tile {
            self.builder.set_field(FieldValue::Position {
                x: tile.x,
                y: tile.y,
                plane: tile.plane,
            });
            self.previous.tile = tile;
        }

        let health = host.health();
        if health != self.previous.health {
            self.previous.health = health;
            if self.toggles.health {
                self.builder.set_field(FieldValue::Health(health));
            }
        }

        let prayer = host.prayer();
        if prayer != self.previous.prayer {
            self.previous.prayer = prayer;
            if self.toggles.prayer {
                self.builder.set_field(FieldValue::Prayer(prayer));
            }
        }

        let energy = host.energy();
        if energy != self.previous.energy {
            self.previous.energy = energy;
            if self.toggles.energy {
                self.builder.set_field(FieldValue::Energy(energy));
            }
        }
    }

    /// Write every enabled category and make all of them the packet goal.
    pub fn queue_full_packet(&mut self, host: &impl HostState) {
        let tile = host.position();
        self.builder.set_field(FieldValue::Name(host.actor_name()));
        self.builder.set_field(FieldValue::Position {
            x: tile.x,
            y: tile.y,
            plane: tile.plane,
        });
        self.builder.set_field(FieldValue::World(host.world()));
        self.builder.set_field(FieldValue::AccountType(host.account_type()));
        self.previous.tile = tile;

        let mut goal = FieldSet::MANDATORY;
        if self.toggles.inventory {
            goal.insert(Field::Inventory);
            self.builder.set_field(FieldValue::Inventory(host.inventory()));
        }
        if self.toggles.skills {
            goal.insert(Field::Skills);
            self.builder.set_field(FieldValue::Skills(host.skills()));
        }
        if self.toggles.equipment {
            goal.insert(Field::Equipment);
            self.builder.set_field(FieldValue::Equipment(host.equipment()));
        }
        // Vitals come from the last sampled tick.
        if self.toggles.health {
            goal.insert(Field::Health);
            self.builder.set_field(FieldValue::Health(self.previous.health));
        }
        if self.toggles.prayer {
            goal.insert(Field::Prayer);
            self.builder.set_field(FieldValue::Prayer(self.previous.prayer));
        }
        if self.toggles.energy {
            goal.insert(Field::Energy);
            self.builder.set_field(FieldValue::Energy(self.previous.energy));
        }

        self.builder.set_goal(goal);
        tracing::debug!(?goal, "full snapshot queued");
    }

    /// Flush the live packet if its goal is met.
    fn update_client(&self, first: bool) {
        if !self.builder.is_sendable() {
            return;
        }

        // Once the goal is met, later packets carry plain deltas.
        self.builder.set_goal(FieldSet::EMPTY);
        let flush = self.builder.finalize_and_reset();
        if let Some(payload) = flush.payload {
            let event = TrackerEvent::for_first_packet(first);
            tracing::trace!(event = event.as_str(), fields = ?flush.fields, "packet flushed");
            self.session.send_data(event.as_str(), payload);
        }
    }

    fn post_login(&self) {
        if self.connect_on_login {
            self.session.connect();
        }
    }

    pub fn on_logged_in(&mut self, host: &impl HostState) {
        self.builder.set_field(FieldValue::World(host.world()));
        self.ticks_since_login = Some(0);
    }

    pub fn on_logged_out(&mut self) {
        self.ticks_since_login = None;
        self.session.disconnect();
    }

    pub fn on_inventory_changed(&self, host: &impl HostState) {
        if self.toggles.inventory {
            self.builder.set_field(FieldValue::Inventory(host.inventory()));
        }
    }

    pub fn on_equipment_changed(&self, host: &impl HostState) {
        if self.toggles.equipment {
            self.builder.set_field(FieldValue::Equipment(host.equipment()));
        }
    }

    pub fn on_stat_changed(&self, host: &impl HostState) {
        if self.toggles.skills {
            self.builder.set_field(FieldValue::Skills(host.skills()));
        }
    }

    pub fn on_npc_loot(&self, id: i32, name: &str, combat_level: i32, items: Vec<ItemStack>) {
        self.builder.append_loot(LootEvent::npc(id, combat_level, name, items));
    }

    pub fn on_player_loot(&self, name: &str, combat_level: i32, items: Vec<ItemStack>) {
        self.builder.append_loot(LootEvent::player(combat_level, name, items));
    }

    /// New credential: reconnect with it if a session is active.
    pub fn on_credential_changed(&self, password: &str) {
        self.session.set_socket_builder_options(true, None, password);
    }

    pub fn handle(&mut self, event: HostEvent, host: &impl HostState) {
        match event {
            HostEvent::LoggedIn => self.on_logged_in(host),
            HostEvent::LoggedOut => self.on_logged_out(),
            HostEvent::InventoryChanged => self.on_inventory_changed(host),
            HostEvent::EquipmentChanged => self.on_equipment_changed(host),
            HostEvent::StatChanged => self.on_stat_changed(host),
            HostEvent::NpcLoot {
                id,
                name,
                combat_level,
                items,
            } => self.on_npc_loot(id, &name, combat_level, items),
            HostEvent::PlayerLoot {
                name,
                combat_level,
                items,
            } => self.on_player_loot(&name, combat_level, items),
            HostEvent::CredentialChanged { password } => self.on_credential_changed(&password),
        }
    }

    pub fn shutdown(&self) {
        self.session.disconnect();
    }
}
