//! The shared world boss: spawning, hits and proportional reward splitting.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::stats::{self, StatDelta, StatKind};
use crate::game::types::{BossRecord, DragonRecord, BOSS_SCHEMA_VERSION};

const BOSS_NAMES: &[&str] = &[
    "Cave Troll",
    "Frost Wyrm",
    "Bone Colossus",
    "Storm Hydra",
    "Ashen Behemoth",
    "Void Leviathan",
    "Iron Titan",
    "Plague Lich",
    "Sun Devourer",
    "The Nameless One",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BossSettings {
    pub hp_per_tier: u64,
    pub armor_per_tier: u32,
    pub lifetime_hours: i64,
    pub max_tier: u32,
    pub hit_energy_cost: u32,
    pub crit_chance: f64,
    pub crit_multiplier: u32,
    pub gold_per_tier: u64,
    pub exp_per_tier: u64,
}

impl Default for BossSettings {
    fn default() -> Self {
        Self {
            hp_per_tier: 300,
            armor_per_tier: 3,
            lifetime_hours: 24,
            max_tier: 10,
            hit_energy_cost: 10,
            crit_chance: 0.15,
            crit_multiplier: 2,
            gold_per_tier: 100,
            exp_per_tier: 60,
        }
    }
}

pub fn boss_name(tier: u32) -> &'static str {
    let index = (tier.max(1) as usize - 1).min(BOSS_NAMES.len() - 1);
    BOSS_NAMES[index]
}

/// A fresh boss of `tier` with an empty damage ledger.
pub fn spawn(tier: u32, now: DateTime<Utc>, settings: &BossSettings) -> BossRecord {
    let tier = tier.clamp(1, settings.max_tier.max(1));
    let max_hp = settings.hp_per_tier.saturating_mul(tier as u64).max(1);
    BossRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name: boss_name(tier).to_string(),
        tier,
        max_hp,
        hp: max_hp,
        armor: settings.armor_per_tier.saturating_mul(tier),
        spawned_at: now,
        expires_at: now + Duration::hours(settings.lifetime_hours),
        damage_ledger: BTreeMap::new(),
        schema_version: BOSS_SCHEMA_VERSION,
    }
}

/// Tier to spawn given the current boss, or `None` while it is alive and fresh.
/// A kill escalates the tier; an escape keeps it.
pub fn respawn_tier(current: Option<&BossRecord>, now: DateTime<Utc>, settings: &BossSettings) -> Option<u32> {
    match current {
        None => Some(1),
        Some(boss) if boss.is_dead() => Some((boss.tier + 1).min(settings.max_tier.max(1))),
        Some(boss) if boss.is_expired(now) => Some(boss.tier),
        Some(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossHit {
    pub damage: u64,
    pub critical: bool,
    pub hp_left: u64,
    pub killed: bool,
    pub energy: StatDelta,
}

/// One attack by `player_id`'s dragon. The full damage is added to the ledger
/// even when it exceeds the remaining hit points.
pub fn strike<R: Rng + ?Sized>(
    boss: &mut BossRecord,
    player_id: &str,
    dragon: &mut DragonRecord,
    settings: &BossSettings,
    rng: &mut R,
) -> Result<BossHit, GameError> {
    if boss.is_dead() {
        return Err(GameError::EntityNotFound(format!("{} is already defeated", boss.name)));
    }
    if dragon.energy < settings.hit_energy_cost {
        return Err(GameError::InsufficientEnergy {
            needed: settings.hit_energy_cost,
            available: dragon.energy,
        });
    }
    let energy = stats::adjust(dragon, StatKind::Energy, -(settings.hit_energy_cost as i64));

    let roll = dragon.strength as i64 + rng.gen_range(0..=5) - boss.armor as i64;
    let mut damage = roll.max(1) as u64;
    let critical = rng.gen_bool(settings.crit_chance.clamp(0.0, 1.0));
    if critical {
        damage *= settings.crit_multiplier as u64;
    }
    Ok(record_hit(boss, player_id, damage, critical, energy))
}

/// Apply a hit of known size. Used by [`strike`].
pub fn record_hit(boss: &mut BossRecord, player_id: &str, damage: u64, critical: bool, energy: StatDelta) -> BossHit {
    boss.hp = boss.hp.saturating_sub(damage);
    *boss
        .damage_ledger
        .entry(player_id.to_ascii_lowercase())
        .or_insert(0) += damage;
    BossHit {
        damage,
        critical,
        hp_left: boss.hp,
        killed: boss.hp == 0,
        energy,
    }
}

/// Split `pool` by each participant's share: `floor(pool * d_i / D)`.
/// The sum of shares never exceeds `pool`.
pub fn distribute(pool: u64, ledger: &BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    let total: u128 = ledger.values().map(|d| *d as u128).sum();
    if total == 0 {
        return BTreeMap::new();
    }
    ledger
        .iter()
        .filter(|(_, damage)| **damage > 0)
        .map(|(id, damage)| {
            let share = (pool as u128 * *damage as u128) / total;
            (id.clone(), share as u64)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossReward {
    pub player_id: String,
    pub damage: u64,
    pub gold: u32,
    pub exp: u32,
}

/// Gold and experience owed to each participant of a defeated boss.
pub fn rewards(boss: &BossRecord, settings: &BossSettings) -> Vec<BossReward> {
    let tier = boss.tier as u64;
    let gold = distribute(settings.gold_per_tier.saturating_mul(tier), &boss.damage_ledger);
    let exp = distribute(settings.exp_per_tier.saturating_mul(tier), &boss.damage_ledger);
    boss.damage_ledger
        .iter()
        .map(|(id, damage)| BossReward {
            player_id: id.clone(),
            damage: *damage,
            gold: gold.get(id).copied().unwrap_or(0).min(u32::MAX as u64) as u32,
            exp: exp.get(id).copied().unwrap_or(0).min(u32::MAX as u64) as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::DragonOwner;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn spawn_scales_with_tier() {
        let now = Utc::now();
        let boss = spawn(3, now, &BossSettings::default());
        assert_eq!(boss.max_hp, 900);
        assert_eq!(boss.hp, 900);
        assert_eq!(boss.armor, 9);
        assert!(boss.damage_ledger.is_empty());
        assert_eq!(boss.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn respawn_rules() {
        let now = Utc::now();
        let settings = BossSettings::default();
        assert_eq!(respawn_tier(None, now, &settings), Some(1));
        let mut boss = spawn(2, now, &settings);
        assert_eq!(respawn_tier(Some(&boss), now, &settings), None);
        assert_eq!(respawn_tier(Some(&boss), now + Duration::hours(24), &settings), Some(2));
        boss.hp = 0;
        assert_eq!(respawn_tier(Some(&boss), now, &settings), Some(3));
        let top = BossRecord { hp: 0, ..spawn(10, now, &settings) };
        assert_eq!(respawn_tier(Some(&top), now, &settings), Some(10));
    }

    #[test]
    fn distribute_floors_and_never_exceeds_pool() {
        let mut ledger = BTreeMap::new();
        ledger.insert("a".to_string(), 1);
        ledger.insert("b".to_string(), 1);
        ledger.insert("c".to_string(), 1);
        let shares = distribute(100, &ledger);
        assert!(shares.values().all(|s| *s == 33));
        assert!(shares.values().sum::<u64>() <= 100);
    }

    #[test]
    fn even_split_for_equal_hits() {
        let now = Utc::now();
        let settings = BossSettings::default();
        let mut boss = spawn(1, now, &settings);
        boss.hp = 10;
        let energy = StatDelta { stat: StatKind::Energy, old: 100, new: 90 };
        let first = record_hit(&mut boss, "a", 6, false, energy);
        assert!(!first.killed);
        let second = record_hit(&mut boss, "b", 6, false, energy);
        assert!(second.killed);
        assert_eq!(boss.hp, 0);
        let rewards = rewards(&boss, &settings);
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].gold, rewards[1].gold);
        assert_eq!(rewards[0].gold, 50);
        assert_eq!(rewards[0].exp, 30);
    }

    #[test]
    fn strike_needs_energy_and_hits_at_least_once() {
        let now = Utc::now();
        let settings = BossSettings::default();
        let mut boss = spawn(10, now, &settings);
        let mut dragon = DragonRecord::new(DragonOwner::World, "Ember", now);
        dragon.strength = 0;
        let mut rng = StdRng::seed_from_u64(1);
        let hit = strike(&mut boss, "Ann", &mut dragon, &settings, &mut rng).unwrap();
        assert!(hit.damage >= 1);
        assert_eq!(dragon.energy, 90);
        assert_eq!(boss.damage_ledger.get("ann"), Some(&hit.damage));

        dragon.energy = 5;
        assert!(matches!(
            strike(&mut boss, "Ann", &mut dragon, &settings, &mut rng),
            Err(GameError::InsufficientEnergy { .. })
        ));
    }
}
