use serde::{Deserialize, Serialize};

/// Account-level stats returned by a successful login.
///
/// Distinct from [`crate::PlayerSnapshot`]: these come from the account
/// record, the snapshot from the game service. Missing fields fall back to
/// the values a freshly registered account starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountStats {
    pub health: u32,
    pub max_health: u32,
    pub damage: u32,
    pub level: u32,
    pub exp: u64,
    pub current_map: String,
}

impl Default for AccountStats {
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            damage: 10,
            level: 1,
            exp: 0,
            current_map: "slum".to_string(),
        }
    }
}
