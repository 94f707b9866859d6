//! What the tracker needs from its host application.

use serde::Deserialize;

use gimptrack_core::{ItemStack, SkillXp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPoint {
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }
}

/// Read accessors over the host's current state. Sampled once per tick.
pub trait HostState {
    fn actor_name(&self) -> String;
    fn position(&self) -> WorldPoint;
    fn world(&self) -> i32;
    fn account_type(&self) -> i32;
    fn health(&self) -> i32;
    fn prayer(&self) -> i32;
    fn energy(&self) -> i32;
    /// `None` when the host has no inventory container loaded.
    fn inventory(&self) -> Option<Vec<ItemStack>>;
    fn equipment(&self) -> Option<Vec<ItemStack>>;
    fn skills(&self) -> Vec<SkillXp>;
}

/// Host notifications the tracker reacts to between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    LoggedIn,
    LoggedOut,
    InventoryChanged,
    EquipmentChanged,
    StatChanged,
    NpcLoot {
        id: i32,
        name: String,
        combat_level: i32,
        #[serde(default)]
        items: Vec<ItemStack>,
    },
    PlayerLoot {
        name: String,
        combat_level: i32,
        #[serde(default)]
        items: Vec<ItemStack>,
    },
    CredentialChanged {
        password: String,
    },
}
