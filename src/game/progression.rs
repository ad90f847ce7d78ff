//! Experience, level thresholds and level-up growth.
//!
//! Threshold rule: reaching the next level from `level` costs `level * 100` experience.
//! Gains that span several thresholds level up repeatedly, carrying the remainder.

use serde::{Deserialize, Serialize};

use crate::game::types::{Ability, DragonRecord, PlayerRecord, ATTRIBUTE_CAP};

pub const EXP_PER_LEVEL: u32 = 100;
pub const HEALTH_PER_LEVEL: u32 = 20;
pub const STRENGTH_PER_LEVEL: u32 = 2;
pub const ENDURANCE_PER_LEVEL: u32 = 2;
pub const INTELLIGENCE_PER_LEVEL: u32 = 1;
pub const CHARISMA_PER_LEVEL: u32 = 1;

/// Levels that grant an ability the first time they are reached.
pub const LEVEL_ABILITIES: &[(u32, Ability)] = &[(5, Ability::Fury), (10, Ability::Regeneration)];

pub fn threshold(level: u32) -> u32 {
    level.max(1).saturating_mul(EXP_PER_LEVEL)
}

pub fn ability_for_level(level: u32) -> Option<Ability> {
    LEVEL_ABILITIES
        .iter()
        .find(|(at, _)| *at == level)
        .map(|(_, ability)| *ability)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
    /// Abilities newly added by this gain. Already-known abilities are never repeated.
    pub unlocked: Vec<Ability>,
}

fn grow(value: &mut u32, by: u32) {
    *value = value.saturating_add(by).min(ATTRIBUTE_CAP);
}

/// Add experience to a dragon, levelling up as many times as the gain allows.
/// Each level raises max health and attributes and fully heals the dragon.
pub fn add_experience(dragon: &mut DragonRecord, amount: u32) -> Option<LevelUp> {
    let from = dragon.level;
    let mut unlocked = Vec::new();
    dragon.exp = dragon.exp.saturating_add(amount);
    while dragon.exp >= threshold(dragon.level) {
        dragon.exp -= threshold(dragon.level);
        dragon.level += 1;
        dragon.max_health = dragon.max_health.saturating_add(HEALTH_PER_LEVEL);
        grow(&mut dragon.strength, STRENGTH_PER_LEVEL);
        grow(&mut dragon.endurance, ENDURANCE_PER_LEVEL);
        grow(&mut dragon.intelligence, INTELLIGENCE_PER_LEVEL);
        grow(&mut dragon.charisma, CHARISMA_PER_LEVEL);
        dragon.health = dragon.max_health;
        if let Some(ability) = ability_for_level(dragon.level) {
            if dragon.abilities.insert(ability) {
                unlocked.push(ability);
            }
        }
    }
    (dragon.level > from).then(|| LevelUp {
        from,
        to: dragon.level,
        unlocked,
    })
}

/// Player-side track: same thresholds, no stat growth.
pub fn add_player_experience(player: &mut PlayerRecord, amount: u32) -> Option<LevelUp> {
    let from = player.level;
    player.exp = player.exp.saturating_add(amount);
    while player.exp >= threshold(player.level) {
        player.exp -= threshold(player.level);
        player.level += 1;
    }
    (player.level > from).then(|| LevelUp {
        from,
        to: player.level,
        unlocked: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::DragonOwner;
    use chrono::Utc;

    fn dragon() -> DragonRecord {
        DragonRecord::new(DragonOwner::World, "Ember", Utc::now())
    }

    #[test]
    fn single_grant_carries_remainder() {
        let mut d = dragon();
        let up = add_experience(&mut d, 250).expect("level up");
        assert_eq!(up.from, 1);
        assert_eq!(up.to, 2);
        assert_eq!(d.level, 2);
        assert_eq!(d.exp, 150);
    }

    #[test]
    fn exact_threshold_levels_up() {
        let mut d = dragon();
        add_experience(&mut d, 100);
        assert_eq!((d.level, d.exp), (2, 0));
    }

    #[test]
    fn level_up_grows_stats_and_heals() {
        let mut d = dragon();
        d.health = 12;
        add_experience(&mut d, 100);
        assert_eq!(d.max_health, 120);
        assert_eq!(d.health, 120);
        assert_eq!(d.strength, 12);
        assert_eq!(d.endurance, 12);
        assert_eq!(d.intelligence, 11);
        assert_eq!(d.charisma, 11);
    }

    #[test]
    fn large_grant_spans_many_levels() {
        let mut d = dragon();
        // 100 + 200 + 300 + 400 = 1000 reaches level 5 exactly.
        let up = add_experience(&mut d, 1000).expect("level up");
        assert_eq!(d.level, 5);
        assert_eq!(d.exp, 0);
        assert_eq!(up.unlocked, vec![Ability::Fury]);
    }

    #[test]
    fn ability_unlocks_are_not_duplicated() {
        let mut d = dragon();
        d.abilities.insert(Ability::Fury);
        let up = add_experience(&mut d, 1000).expect("level up");
        assert!(up.unlocked.is_empty());
        assert_eq!(d.abilities.iter().filter(|a| **a == Ability::Fury).count(), 1);
    }

    #[test]
    fn small_grant_does_not_level() {
        let mut d = dragon();
        assert!(add_experience(&mut d, 99).is_none());
        assert_eq!(d.exp, 99);
    }

    #[test]
    fn player_track_uses_same_thresholds() {
        let mut p = PlayerRecord::new("p", "P", 100, Utc::now());
        let up = add_player_experience(&mut p, 320).expect("level up");
        assert_eq!(up.to, 3);
        assert_eq!(p.exp, 20);
    }
}
