//! Item catalog.
//!
//! The server only ever sends item names. Everything the client knows about an
//! item (its slot, its stat bonus, how much a potion heals) comes from this
//! catalog. Unknown names resolve to `None` rather than an error so that new
//! server-side items degrade to "no bonus" instead of breaking the client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::player::EquipSlot;
use crate::error::DomainError;

/// Name of the only consumable the client knows how to use.
pub const HEALTH_POTION: &str = "Health Potion";

const HEALTH_POTION_HEAL: u32 = 50;

/// Equipment material tier, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Bronze,
    Stone,
    Iron,
    Mithril,
    Adamantine,
}

impl Material {
    pub const ALL: [Material; 5] = [
        Material::Bronze,
        Material::Stone,
        Material::Iron,
        Material::Mithril,
        Material::Adamantine,
    ];

    fn rank(self) -> u32 {
        match self {
            Material::Bronze => 1,
            Material::Stone => 2,
            Material::Iron => 3,
            Material::Mithril => 4,
            Material::Adamantine => 5,
        }
    }

    /// Damage added by a sword of this material.
    pub fn weapon_bonus(self) -> u32 {
        self.rank()
    }

    /// Max HP added by an armor piece (armor, helmet or boots) of this material.
    pub fn armor_bonus(self) -> u32 {
        1 + 2 * self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Material::Bronze => "Bronze",
            Material::Stone => "Stone",
            Material::Iron => "Iron",
            Material::Mithril => "Mithril",
            Material::Adamantine => "Adamantine",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::parse(format!("Unknown material: {}", s)))
    }
}

/// What an item does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Restores HP when used.
    Consumable { heal: u32 },
    /// Worn in a slot; weapons add damage, everything else adds max HP.
    Equipment { slot: EquipSlot, material: Material },
}

/// Catalog entry resolved from an item name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    name: String,
    kind: ItemKind,
}

impl ItemDefinition {
    /// Look an item up by its display name, e.g. `"Iron Helmet"`.
    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.trim();
        if name == HEALTH_POTION {
            return Some(Self {
                name: name.to_string(),
                kind: ItemKind::Consumable {
                    heal: HEALTH_POTION_HEAL,
                },
            });
        }

        let (material, piece) = name.split_once(' ')?;
        let material = material.parse::<Material>().ok()?;
        let slot = match piece {
            "Sword" => EquipSlot::Weapon,
            "Armor" => EquipSlot::Armor,
            "Helmet" => EquipSlot::Helmet,
            "Boots" => EquipSlot::Boots,
            _ => return None,
        };

        Some(Self {
            name: name.to_string(),
            kind: ItemKind::Equipment { slot, material },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_consumable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable { .. })
    }

    /// Slot the item occupies, if it is equipment.
    pub fn slot(&self) -> Option<EquipSlot> {
        match self.kind {
            ItemKind::Equipment { slot, .. } => Some(slot),
            ItemKind::Consumable { .. } => None,
        }
    }

    /// Damage bonus granted while equipped.
    pub fn damage_bonus(&self) -> u32 {
        match self.kind {
            ItemKind::Equipment {
                slot: EquipSlot::Weapon,
                material,
            } => material.weapon_bonus(),
            _ => 0,
        }
    }

    /// Max HP bonus granted while equipped.
    pub fn max_hp_bonus(&self) -> u32 {
        match self.kind {
            ItemKind::Equipment { slot, material } if slot != EquipSlot::Weapon => {
                material.armor_bonus()
            }
            _ => 0,
        }
    }

    /// Short stat line, e.g. `"+3 DMG"` or `"Restores 50 HP"`.
    pub fn describe(&self) -> String {
        match self.kind {
            ItemKind::Consumable { heal } => format!("Restores {} HP", heal),
            ItemKind::Equipment {
                slot: EquipSlot::Weapon,
                material,
            } => format!("+{} DMG", material.weapon_bonus()),
            ItemKind::Equipment { material, .. } => format!("+{} HP", material.armor_bonus()),
        }
    }
}
