use serde::{Deserialize, Serialize};

/// Monster the player is currently fighting, as last reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub max_hp: u32,
    #[serde(default)]
    pub dmg: u32,
}

fn default_level() -> u32 {
    1
}

impl EnemySnapshot {
    /// Subtract `amount` from displayed HP, clamped at zero.
    pub fn apply_damage(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(amount);
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_damage() {
        let mut rat = EnemySnapshot {
            name: "Rat".into(),
            hp: 20,
            max_hp: 20,
            ..Default::default()
        };
        rat.apply_damage(5);
        assert_eq!(rat.hp, 15);
        assert!(!rat.is_defeated());
    }

    #[test]
    fn test_apply_damage_clamps_at_zero() {
        let mut rat = EnemySnapshot {
            hp: 3,
            max_hp: 20,
            ..Default::default()
        };
        rat.apply_damage(7);
        assert_eq!(rat.hp, 0);
        assert!(rat.is_defeated());
    }
}
