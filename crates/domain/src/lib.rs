//! Hearthlink domain vocabulary.
//!
//! Pure data: no I/O, no async. The server is authoritative for every value
//! here; the client only reads snapshots and derives display values from them.

extern crate self as hearthlink_domain;

pub mod entities;
pub mod error;
pub mod value_objects;

pub use entities::{
    EnemySnapshot, EquipSlot, Equipment, InventoryItem, ItemDefinition, ItemKind, Material,
    PlayerSnapshot, HEALTH_POTION,
};
pub use error::DomainError;
pub use value_objects::{exp_required_for_level, AccountStats, GameMap, MapId, WORLD_MAPS};
