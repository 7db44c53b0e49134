//! Client-side mirror of the battle phase.
//!
//! The server decides damage, loot and levels. This module only decides
//! which requests make sense to send, and folds the server's answers into the
//! displayed state.

use hearthlink_domain::{EnemySnapshot, GameMap, PlayerSnapshot};
use hearthlink_shared::{GameAction, GameResponse};

use super::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    Idle,
    Engaged,
}

/// How a resolved attack left the battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleOutcome {
    Ongoing,
    Victory {
        exp_gained: u64,
        gold_gained: u64,
        dropped_items: Vec<String>,
        level_up: bool,
    },
    Defeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub player_damage: u32,
    pub enemy_damage: Option<u32>,
    /// Enemy as displayed after the hit; `None` once the battle is over.
    pub enemy: Option<EnemySnapshot>,
    pub outcome: BattleOutcome,
}

/// Result of a completed game request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatOutcome {
    Encounter(EnemySnapshot),
    NoMonster,
    Attack(AttackReport),
    Healed { amount: u32 },
    /// `acknowledged` is false when the server never confirmed the flee.
    Fled { acknowledged: bool },
    Equipped(PlayerSnapshot),
    Unequipped(PlayerSnapshot),
    PlayerLoaded(PlayerSnapshot),
}

#[derive(Debug, Default)]
pub struct CombatSession {
    enemy: Option<EnemySnapshot>,
}

impl CombatSession {
    pub fn phase(&self) -> CombatPhase {
        if self.enemy.is_some() {
            CombatPhase::Engaged
        } else {
            CombatPhase::Idle
        }
    }

    pub fn enemy(&self) -> Option<&EnemySnapshot> {
        self.enemy.as_ref()
    }

    pub fn reset(&mut self) {
        self.enemy = None;
    }

    /// Local legality check, run before any frame is sent.
    pub fn preflight(
        &self,
        action: &GameAction,
        player: Option<&PlayerSnapshot>,
    ) -> Result<(), SessionError> {
        let engaged = self.phase() == CombatPhase::Engaged;
        match action {
            GameAction::FindMonster { map } => {
                if engaged {
                    return Err(SessionError::invalid_state("You are currently in battle"));
                }
                let map = GameMap::by_id(*map)
                    .map_err(|e| SessionError::invalid_state(e.to_string()))?;
                if let Some(p) = player {
                    if !map.is_unlocked_for(p.level) {
                        return Err(SessionError::invalid_state(format!(
                            "{} requires level {}",
                            map.name, map.min_level
                        )));
                    }
                }
                Ok(())
            }
            GameAction::Equip { .. } | GameAction::Unequip { .. } if engaged => Err(
                SessionError::invalid_state("Cannot change equipment during battle"),
            ),
            GameAction::Attack | GameAction::Flee if !engaged => {
                Err(SessionError::invalid_state("You are not in battle"))
            }
            GameAction::UsePotion { item } => {
                let Some(p) = player else {
                    return Err(SessionError::invalid_state(format!("You have no {}s", item)));
                };
                if p.quantity_of(item) == 0 {
                    return Err(SessionError::invalid_state(format!("You have no {}s", item)));
                }
                if p.is_at_full_hp() {
                    return Err(SessionError::invalid_state("HP is already full"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Called once the request is committed. Flee leaves the battle here,
    /// before the frame goes out.
    pub fn begin(&mut self, action: &GameAction) {
        if matches!(action, GameAction::Flee) {
            self.enemy = None;
        }
    }

    /// Completion for a flee whose answer never arrived.
    pub fn flee_unconfirmed() -> CombatOutcome {
        CombatOutcome::Fled {
            acknowledged: false,
        }
    }

    /// Fold a server response for `action` into local state.
    pub fn fold(
        &mut self,
        action: &GameAction,
        response: GameResponse,
        player: &mut Option<PlayerSnapshot>,
    ) -> Result<CombatOutcome, SessionError> {
        if matches!(action, GameAction::Flee) {
            return Ok(CombatOutcome::Fled {
                acknowledged: response.success,
            });
        }

        if !response.success {
            let msg = response
                .error
                .unwrap_or_else(|| format!("{} failed", action.label()));
            return Err(SessionError::rejected(msg));
        }

        match action {
            GameAction::Player => {
                let snapshot = response.player.ok_or_else(|| {
                    SessionError::ProtocolError("player response without a player".into())
                })?;
                *player = Some(snapshot.clone());
                Ok(CombatOutcome::PlayerLoaded(snapshot))
            }
            GameAction::FindMonster { .. } => match response.monster {
                Some(monster) => {
                    self.enemy = Some(monster.clone());
                    Ok(CombatOutcome::Encounter(monster))
                }
                None => Ok(CombatOutcome::NoMonster),
            },
            GameAction::Attack => Ok(CombatOutcome::Attack(self.fold_attack(response, player))),
            GameAction::UsePotion { .. } => {
                if let Some(snapshot) = response.player {
                    *player = Some(snapshot);
                }
                Ok(CombatOutcome::Healed {
                    amount: response.healed.unwrap_or(0),
                })
            }
            GameAction::Equip { .. } | GameAction::Unequip { .. } => {
                let snapshot = response.player.ok_or_else(|| {
                    SessionError::ProtocolError("equipment response without a player".into())
                })?;
                *player = Some(snapshot.clone());
                if matches!(action, GameAction::Equip { .. }) {
                    Ok(CombatOutcome::Equipped(snapshot))
                } else {
                    Ok(CombatOutcome::Unequipped(snapshot))
                }
            }
            GameAction::Flee => Ok(CombatOutcome::Fled { acknowledged: true }),
        }
    }

    fn fold_attack(
        &mut self,
        response: GameResponse,
        player: &mut Option<PlayerSnapshot>,
    ) -> AttackReport {
        let had_snapshot = response.player.is_some();
        if let Some(snapshot) = response.player {
            *player = Some(snapshot);
        }

        let player_damage = response.player_damage.unwrap_or(0);
        if let Some(enemy) = self.enemy.as_mut() {
            enemy.apply_damage(player_damage);
        }

        if response.enemy_defeated {
            self.enemy = None;
            return AttackReport {
                player_damage,
                enemy_damage: None,
                enemy: None,
                outcome: BattleOutcome::Victory {
                    exp_gained: response.exp_gained.unwrap_or(0),
                    gold_gained: response.gold_gained.unwrap_or(0),
                    dropped_items: response.dropped_items,
                    level_up: response.level_up,
                },
            };
        }

        // A fresh snapshot already reflects the counterattack.
        if !had_snapshot {
            if let (Some(p), Some(dmg)) = (player.as_mut(), response.enemy_damage) {
                p.take_display_damage(dmg);
            }
        }

        let outcome = if response.player_defeated {
            self.enemy = None;
            BattleOutcome::Defeat
        } else {
            BattleOutcome::Ongoing
        };

        AttackReport {
            player_damage,
            enemy_damage: response.enemy_damage,
            enemy: self.enemy.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlink_domain::{InventoryItem, MapId, HEALTH_POTION};

    fn rat() -> EnemySnapshot {
        EnemySnapshot {
            name: "Rat".into(),
            level: 1,
            hp: 20,
            max_hp: 20,
            dmg: 3,
        }
    }

    fn hero(hp: u32, potions: u32) -> PlayerSnapshot {
        PlayerSnapshot {
            username: "ana".into(),
            hp,
            max_hp: 100,
            dmg: 10,
            level: 1,
            inventory: vec![InventoryItem {
                name: HEALTH_POTION.into(),
                quantity: potions,
            }],
            ..Default::default()
        }
    }

    fn engaged() -> CombatSession {
        CombatSession { enemy: Some(rat()) }
    }

    #[test]
    fn test_attack_hit_keeps_battle_going() {
        let mut combat = engaged();
        let mut player = Some(hero(100, 0));
        let response = GameResponse {
            success: true,
            player_damage: Some(5),
            ..Default::default()
        };

        let outcome = combat
            .fold(&GameAction::Attack, response, &mut player)
            .expect("attack folds");

        assert_eq!(combat.phase(), CombatPhase::Engaged);
        assert_eq!(combat.enemy().map(|e| e.hp), Some(15));
        let CombatOutcome::Attack(report) = outcome else {
            panic!("expected attack report");
        };
        assert_eq!(report.outcome, BattleOutcome::Ongoing);
    }

    #[test]
    fn test_attack_overkill_clamps_and_wins() {
        let mut combat = engaged();
        let mut player = Some(hero(100, 0));
        let response = GameResponse {
            success: true,
            player_damage: Some(99),
            enemy_defeated: true,
            exp_gained: Some(12),
            gold_gained: Some(4),
            dropped_items: vec!["Bronze Boots".into()],
            level_up: true,
            ..Default::default()
        };

        let outcome = combat
            .fold(&GameAction::Attack, response, &mut player)
            .expect("attack folds");

        assert_eq!(combat.phase(), CombatPhase::Idle);
        assert_eq!(
            outcome,
            CombatOutcome::Attack(AttackReport {
                player_damage: 99,
                enemy_damage: None,
                enemy: None,
                outcome: BattleOutcome::Victory {
                    exp_gained: 12,
                    gold_gained: 4,
                    dropped_items: vec!["Bronze Boots".into()],
                    level_up: true,
                },
            })
        );
    }

    #[test]
    fn test_counterattack_without_snapshot_updates_displayed_hp() {
        let mut combat = engaged();
        let mut player = Some(hero(50, 0));
        let response = GameResponse {
            success: true,
            player_damage: Some(5),
            enemy_damage: Some(7),
            ..Default::default()
        };
        combat
            .fold(&GameAction::Attack, response, &mut player)
            .expect("attack folds");
        assert_eq!(player.map(|p| p.hp), Some(43));
    }

    #[test]
    fn test_counterattack_with_snapshot_uses_snapshot() {
        let mut combat = engaged();
        let mut player = Some(hero(50, 0));
        let response = GameResponse {
            success: true,
            player: Some(hero(46, 0)),
            player_damage: Some(5),
            enemy_damage: Some(4),
            ..Default::default()
        };
        combat
            .fold(&GameAction::Attack, response, &mut player)
            .expect("attack folds");
        assert_eq!(player.map(|p| p.hp), Some(46));
    }

    #[test]
    fn test_defeat_ends_battle() {
        let mut combat = engaged();
        let mut player = Some(hero(3, 0));
        let response = GameResponse {
            success: true,
            player_damage: Some(1),
            enemy_damage: Some(5),
            player_defeated: true,
            ..Default::default()
        };
        let outcome = combat
            .fold(&GameAction::Attack, response, &mut player)
            .expect("attack folds");
        assert_eq!(combat.phase(), CombatPhase::Idle);
        assert!(matches!(
            outcome,
            CombatOutcome::Attack(AttackReport {
                outcome: BattleOutcome::Defeat,
                ..
            })
        ));
    }

    #[test]
    fn test_find_monster_engages() {
        let mut combat = CombatSession::default();
        let mut player = None;
        let response = GameResponse {
            success: true,
            monster: Some(rat()),
            ..Default::default()
        };
        let outcome = combat
            .fold(
                &GameAction::FindMonster { map: MapId::SLUM },
                response,
                &mut player,
            )
            .expect("find folds");
        assert_eq!(outcome, CombatOutcome::Encounter(rat()));
        assert_eq!(combat.phase(), CombatPhase::Engaged);
    }

    #[test]
    fn test_find_monster_without_monster_stays_idle() {
        let mut combat = CombatSession::default();
        let outcome = combat
            .fold(
                &GameAction::FindMonster { map: MapId::SLUM },
                GameResponse {
                    success: true,
                    ..Default::default()
                },
                &mut None,
            )
            .expect("find folds");
        assert_eq!(outcome, CombatOutcome::NoMonster);
        assert_eq!(combat.phase(), CombatPhase::Idle);
    }

    #[test]
    fn test_rejected_response_carries_server_error() {
        let mut combat = engaged();
        let response = GameResponse {
            success: false,
            error: Some("Invalid token".into()),
            ..Default::default()
        };
        assert_eq!(
            combat.fold(&GameAction::Attack, response, &mut None),
            Err(SessionError::rejected("Invalid token"))
        );
        assert_eq!(combat.phase(), CombatPhase::Engaged);
    }

    #[test]
    fn test_preflight_by_phase() {
        let idle = CombatSession::default();
        let player = hero(50, 1);
        assert!(idle.preflight(&GameAction::Attack, Some(&player)).is_err());
        assert!(idle.preflight(&GameAction::Flee, Some(&player)).is_err());
        assert!(idle
            .preflight(&GameAction::FindMonster { map: MapId::SLUM }, Some(&player))
            .is_ok());

        let fighting = engaged();
        assert!(fighting.preflight(&GameAction::Attack, Some(&player)).is_ok());
        assert!(fighting
            .preflight(&GameAction::FindMonster { map: MapId::SLUM }, Some(&player))
            .is_err());
        assert!(fighting
            .preflight(
                &GameAction::Equip {
                    item: "Iron Sword".into()
                },
                Some(&player)
            )
            .is_err());
    }

    #[test]
    fn test_preflight_locked_map() {
        let idle = CombatSession::default();
        let player = hero(50, 0);
        let plains = MapId::new(2).expect("plains");
        assert_eq!(
            idle.preflight(&GameAction::FindMonster { map: plains }, Some(&player)),
            Err(SessionError::invalid_state("Plains requires level 10"))
        );
    }

    #[test]
    fn test_potion_guards() {
        let idle = CombatSession::default();
        let potion = GameAction::use_health_potion();
        assert!(idle.preflight(&potion, Some(&hero(50, 0))).is_err());
        assert_eq!(
            idle.preflight(&potion, Some(&hero(100, 2))),
            Err(SessionError::invalid_state("HP is already full"))
        );
        assert!(idle.preflight(&potion, Some(&hero(50, 2))).is_ok());
    }

    #[test]
    fn test_flee_leaves_battle_before_answer() {
        let mut combat = engaged();
        combat.begin(&GameAction::Flee);
        assert_eq!(combat.phase(), CombatPhase::Idle);
        assert_eq!(
            combat.fold(&GameAction::Flee, GameResponse::default(), &mut None),
            Ok(CombatOutcome::Fled {
                acknowledged: false
            })
        );
    }
}
