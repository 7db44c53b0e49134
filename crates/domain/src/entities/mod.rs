//! Snapshot entities mirrored from the server.

mod enemy;
mod item;
mod player;

pub use enemy::EnemySnapshot;
pub use item::{ItemDefinition, ItemKind, Material, HEALTH_POTION};
pub use player::{EquipSlot, Equipment, InventoryItem, PlayerSnapshot};
