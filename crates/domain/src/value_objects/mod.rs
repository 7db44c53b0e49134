//! Value objects - Immutable objects defined by their attributes

mod account_stats;
mod progression;
mod world_map;

pub use account_stats::AccountStats;
pub use progression::exp_required_for_level;
pub use world_map::{GameMap, MapId, WORLD_MAPS};
