//! Outbound record: the partially-filled snapshot a packet is built from.
//!
//! The record only knows how to store values and render the fields it was
//! told about. Readiness (goal vs. changed) lives in [`crate::packet`].

mod field;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub use field::{Field, FieldSet};

/// One container slot (inventory or equipment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: i32,
    pub quantity: i32,
}

impl ItemStack {
    pub fn new(id: i32, quantity: i32) -> Self {
        Self { id, quantity }
    }
}

/// Experience for one skill, by skill index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillXp {
    #[serde(rename = "skill")]
    pub index: u32,
    pub xp: i32,
}

impl SkillXp {
    pub fn new(index: u32, xp: i32) -> Self {
        Self { index, xp }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LootKind {
    Npc,
    Player,
}

/// A loot drop as reported by the host. Never merged with other drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootEvent {
    /// NPC id; player sources have none.
    pub id: Option<i32>,
    pub combat_level: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LootKind,
    /// Epoch millis, as a string.
    pub timestamp: String,
    pub items: Vec<ItemStack>,
}

impl LootEvent {
    pub fn npc(id: i32, combat_level: i32, name: impl Into<String>, items: Vec<ItemStack>) -> Self {
        Self {
            id: Some(id),
            combat_level,
            name: name.into(),
            kind: LootKind::Npc,
            timestamp: epoch_millis_now(),
            items,
        }
    }

    pub fn player(combat_level: i32, name: impl Into<String>, items: Vec<ItemStack>) -> Self {
        Self {
            id: None,
            combat_level,
            name: name.into(),
            kind: LootKind::Player,
            timestamp: epoch_millis_now(),
            items,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

fn epoch_millis_now() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}

/// A single field write. Loot is appended separately since it accumulates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Name(String),
    Position { x: i32, y: i32, plane: i32 },
    World(i32),
    AccountType(i32),
    Health(i32),
    Prayer(i32),
    Energy(i32),
    /// `None` when the host has no container to report.
    Inventory(Option<Vec<ItemStack>>),
    Equipment(Option<Vec<ItemStack>>),
    Skills(Vec<SkillXp>),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Name(_) => Field::Name,
            FieldValue::Position { .. } => Field::Position,
            FieldValue::World(_) => Field::World,
            FieldValue::AccountType(_) => Field::AccountType,
            FieldValue::Health(_) => Field::Health,
            FieldValue::Prayer(_) => Field::Prayer,
            FieldValue::Energy(_) => Field::Energy,
            FieldValue::Inventory(_) => Field::Inventory,
            FieldValue::Equipment(_) => Field::Equipment,
            FieldValue::Skills(_) => Field::Skills,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Position {
    x: i32,
    y: i32,
    plane: i32,
}

/// Live record. Values of fields outside `changed` are stale defaults and
/// never rendered.
#[derive(Debug, Clone, Default)]
pub struct OutboundRecord {
    changed: FieldSet,
    name: String,
    position: Position,
    world: i32,
    account_type: i32,
    health: i32,
    prayer: i32,
    energy: i32,
    inventory: Option<Vec<ItemStack>>,
    equipment: Option<Vec<ItemStack>>,
    skills: Vec<SkillXp>,
    loot: Vec<LootEvent>,
}

impl OutboundRecord {
    pub fn changed(&self) -> FieldSet {
        self.changed
    }

    pub fn loot(&self) -> &[LootEvent] {
        &self.loot
    }

    /// Overwrite one field and mark it changed.
    pub fn apply(&mut self, value: FieldValue) {
        self.changed.insert(value.field());
        match value {
            FieldValue::Name(n) => self.name = n,
            FieldValue::Position { x, y, plane } => self.position = Position { x, y, plane },
            FieldValue::World(w) => self.world = w,
            FieldValue::AccountType(t) => self.account_type = t,
            FieldValue::Health(v) => self.health = v,
            FieldValue::Prayer(v) => self.prayer = v,
            FieldValue::Energy(v) => self.energy = v,
            FieldValue::Inventory(items) => self.inventory = items,
            FieldValue::Equipment(items) => self.equipment = items,
            FieldValue::Skills(skills) => self.skills = skills,
        }
    }

    pub fn push_loot(&mut self, event: LootEvent) {
        self.changed.insert(Field::Loot);
        self.loot.push(event);
    }

    /// Render the changed fields as the collector's record map.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for field in self.changed.iter() {
            match field {
                Field::Name => {
                    out.insert("name".into(), json!(self.name));
                }
                Field::Position => {
                    out.insert("x".into(), json!(self.position.x));
                    out.insert("y".into(), json!(self.position.y));
                    out.insert("plane".into(), json!(self.position.plane));
                }
                Field::World => {
                    out.insert("world".into(), json!(self.world));
                }
                Field::AccountType => {
                    out.insert("accountType".into(), json!(self.account_type));
                }
                Field::Health => {
                    out.insert("health".into(), json!(self.health));
                }
                Field::Prayer => {
                    out.insert("prayer".into(), json!(self.prayer));
                }
                Field::Energy => {
                    out.insert("energy".into(), json!(self.energy));
                }
                Field::Inventory => {
                    out.insert("inventory".into(), json!(self.inventory));
                }
                Field::Equipment => {
                    out.insert("equipment".into(), json!(self.equipment));
                }
                Field::Skills => {
                    out.insert("skills".into(), json!(self.skills));
                }
                Field::Loot => {
                    out.insert("loot".into(), json!(self.loot));
                }
            }
        }
        Value::Object(out)
    }
}
