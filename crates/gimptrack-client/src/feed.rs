//! JSON-lines host feed, one line per host tick.
//!
//! ```text
//! {"sample":{"name":"Zezima","position":{"x":3200,"y":3200,"plane":0},...},"events":[{"type":"logged_in"}]}
//! ```
//!
//! A line without a `sample` reuses the previous one.

use serde::Deserialize;

use gimptrack_core::{ItemStack, Result, SkillXp, TrackerError};

use crate::tracker::{HostEvent, HostState, WorldPoint};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct HostSample {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: WorldPoint,
    #[serde(default)]
    pub world: i32,
    #[serde(default)]
    pub account_type: i32,
    #[serde(default = "default_vital")]
    pub health: i32,
    #[serde(default = "default_vital")]
    pub prayer: i32,
    #[serde(default = "default_energy")]
    pub energy: i32,
    #[serde(default)]
    pub inventory: Option<Vec<ItemStack>>,
    #[serde(default)]
    pub equipment: Option<Vec<ItemStack>>,
    #[serde(default)]
    pub skills: Vec<SkillXp>,
}

impl Default for HostSample {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: WorldPoint::default(),
            world: 0,
            account_type: 0,
            health: default_vital(),
            prayer: default_vital(),
            energy: default_energy(),
            inventory: None,
            equipment: None,
            skills: Vec::new(),
        }
    }
}

fn default_vital() -> i32 {
    99
}
fn default_energy() -> i32 {
    100
}

impl HostState for HostSample {
    fn actor_name(&self) -> String {
        self.name.clone()
    }
    fn position(&self) -> WorldPoint {
        self.position
    }
    fn world(&self) -> i32 {
        self.world
    }
    fn account_type(&self) -> i32 {
        self.account_type
    }
    fn health(&self) -> i32 {
        self.health
    }
    fn prayer(&self) -> i32 {
        self.prayer
    }
    fn energy(&self) -> i32 {
        self.energy
    }
    fn inventory(&self) -> Option<Vec<ItemStack>> {
        self.inventory.clone()
    }
    fn equipment(&self) -> Option<Vec<ItemStack>> {
        self.equipment.clone()
    }
    fn skills(&self) -> Vec<SkillXp> {
        self.skills.clone()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedLine {
    #[serde(default)]
    pub sample: Option<HostSample>,
    #[serde(default)]
    pub events: Vec<HostEvent>,
}

impl FeedLine {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| TrackerError::BadRequest(format!("feed line: {e}")))
    }
}
