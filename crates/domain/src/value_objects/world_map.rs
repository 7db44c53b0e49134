//! World map catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Numeric map id as sent in `find_monster` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(u8);

impl MapId {
    /// The starting area.
    pub const SLUM: MapId = MapId(1);

    pub fn new(id: u8) -> Result<Self, DomainError> {
        GameMap::by_id(MapId(id)).map(|m| m.id)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for MapId {
    fn default() -> Self {
        Self::SLUM
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameMap {
    pub id: MapId,
    pub name: &'static str,
    pub min_level: u32,
    pub max_level: u32,
}

pub const WORLD_MAPS: [GameMap; 6] = [
    GameMap { id: MapId(0), name: "Leaf Hamlet", min_level: 1, max_level: 1 },
    GameMap { id: MapId(1), name: "Slum", min_level: 1, max_level: 10 },
    GameMap { id: MapId(2), name: "Plains", min_level: 10, max_level: 20 },
    GameMap { id: MapId(3), name: "Black Leaf Zone", min_level: 20, max_level: 30 },
    GameMap { id: MapId(4), name: "Jungle", min_level: 30, max_level: 40 },
    GameMap { id: MapId(5), name: "Coastline", min_level: 40, max_level: 50 },
];

impl GameMap {
    pub fn by_id(id: MapId) -> Result<&'static GameMap, DomainError> {
        WORLD_MAPS
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| DomainError::not_found("GameMap", id.to_string()))
    }

    pub fn is_unlocked_for(&self, level: u32) -> bool {
        level >= self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_map_id() {
        assert!(MapId::new(6).is_err());
        assert_eq!(MapId::new(2).map(MapId::value), Ok(2));
    }

    #[test]
    fn test_plains_locked_below_ten() {
        let plains = GameMap::by_id(MapId(2)).expect("plains exists");
        assert!(!plains.is_unlocked_for(9));
        assert!(plains.is_unlocked_for(10));
    }

    #[test]
    fn test_default_map_is_slum() {
        assert_eq!(GameMap::by_id(MapId::default()).map(|m| m.name), Ok("Slum"));
    }
}
