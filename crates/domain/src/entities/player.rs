//! Authoritative player snapshot.
//!
//! The server sends the whole player with every state-changing game response.
//! The client replaces its copy wholesale and never merges fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::item::ItemDefinition;
use crate::error::DomainError;
use crate::value_objects::exp_required_for_level;

/// One stack in the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Equipment slots, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Helmet,
    Boots,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 4] = [
        EquipSlot::Weapon,
        EquipSlot::Armor,
        EquipSlot::Helmet,
        EquipSlot::Boots,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EquipSlot::Weapon => "weapon",
            EquipSlot::Armor => "armor",
            EquipSlot::Helmet => "helmet",
            EquipSlot::Boots => "boots",
        }
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipSlot {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weapon" => Ok(EquipSlot::Weapon),
            "armor" => Ok(EquipSlot::Armor),
            "helmet" => Ok(EquipSlot::Helmet),
            "boots" => Ok(EquipSlot::Boots),
            _ => Err(DomainError::parse(format!("Unknown equipment slot: {}", s))),
        }
    }
}

/// Item names currently worn. Older servers omit empty slots entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    #[serde(default)]
    pub helmet: Option<String>,
    #[serde(default)]
    pub boots: Option<String>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&str> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_deref(),
            EquipSlot::Armor => self.armor.as_deref(),
            EquipSlot::Helmet => self.helmet.as_deref(),
            EquipSlot::Boots => self.boots.as_deref(),
        }
    }

    pub fn is_equipped(&self, item: &str) -> bool {
        EquipSlot::ALL.iter().any(|s| self.get(*s) == Some(item))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub max_hp: u32,
    #[serde(default)]
    pub dmg: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub exp: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub equipped: Equipment,
}

fn default_level() -> u32 {
    1
}

impl PlayerSnapshot {
    /// Quantity held of `item`, summed across stacks.
    pub fn quantity_of(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|i| i.name == item)
            .map(|i| i.quantity)
            .sum()
    }

    pub fn is_at_full_hp(&self) -> bool {
        self.hp >= self.max_hp
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }

    /// Base damage plus the equipped weapon's bonus.
    pub fn total_damage(&self) -> u32 {
        let weapon_bonus = self
            .equipped
            .get(EquipSlot::Weapon)
            .and_then(ItemDefinition::lookup)
            .map(|w| w.damage_bonus())
            .unwrap_or(0);
        self.dmg + weapon_bonus
    }

    pub fn exp_to_next_level(&self) -> u64 {
        exp_required_for_level(self.level)
    }

    /// Display-only HP change for counter-damage the server reported without
    /// sending a fresh snapshot.
    pub fn take_display_damage(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight() -> PlayerSnapshot {
        PlayerSnapshot {
            username: "ana".into(),
            hp: 80,
            max_hp: 100,
            dmg: 10,
            level: 3,
            inventory: vec![
                InventoryItem {
                    name: "Health Potion".into(),
                    quantity: 2,
                },
                InventoryItem {
                    name: "Iron Sword".into(),
                    quantity: 1,
                },
            ],
            equipped: Equipment {
                weapon: Some("Iron Sword".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_total_damage_includes_weapon() {
        assert_eq!(knight().total_damage(), 13);
    }

    #[test]
    fn test_total_damage_without_weapon() {
        let mut p = knight();
        p.equipped.weapon = None;
        assert_eq!(p.total_damage(), 10);
    }

    #[test]
    fn test_quantity_of() {
        let p = knight();
        assert_eq!(p.quantity_of("Health Potion"), 2);
        assert_eq!(p.quantity_of("Stone Boots"), 0);
    }

    #[test]
    fn test_take_display_damage_saturates() {
        let mut p = knight();
        p.take_display_damage(500);
        assert_eq!(p.hp, 0);
        assert!(p.is_defeated());
    }

    #[test]
    fn test_exp_to_next_level() {
        assert_eq!(knight().exp_to_next_level(), 145);
    }

    #[test]
    fn test_deserialize_sparse_snapshot() {
        let p: PlayerSnapshot = serde_json::from_str(
            r#"{"username":"ana","hp":5,"max_hp":100,"inventory":[{"name":"Health Potion"}],"equipped":{"weapon":null}}"#,
        )
        .expect("valid snapshot");
        assert_eq!(p.level, 1);
        assert_eq!(p.quantity_of("Health Potion"), 1);
        assert_eq!(p.equipped, Equipment::default());
    }

    #[test]
    fn test_slot_parse() {
        assert_eq!("Boots".parse::<EquipSlot>(), Ok(EquipSlot::Boots));
        assert!("cape".parse::<EquipSlot>().is_err());
    }
}
