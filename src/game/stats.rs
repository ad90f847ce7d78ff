//! Bounded stat mutation and item effect application.
//!
//! Every change goes through [`adjust`] so values are clamped into their declared
//! range: hunger, energy and mood to `0..=STAT_CAP`, health to `0..=max_health`,
//! attributes to `0..=ATTRIBUTE_CAP`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::catalog::{self, ItemEffect};
use crate::game::errors::GameError;
use crate::game::progression::{self, LevelUp};
use crate::game::types::{
    Attribute, DragonRecord, EvolutionPath, PlayerRecord, ATTRIBUTE_CAP, STAT_CAP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatKind {
    Health,
    Hunger,
    Energy,
    Mood,
    Experience,
    Attribute(Attribute),
}

impl StatKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Health => "Health",
            StatKind::Hunger => "Satiety",
            StatKind::Energy => "Energy",
            StatKind::Mood => "Mood",
            StatKind::Experience => "Experience",
            StatKind::Attribute(attr) => attr.label(),
        }
    }
}

/// Old and new value of one stat, kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub stat: StatKind,
    pub old: u32,
    pub new: u32,
}

impl StatDelta {
    pub fn change(&self) -> i64 {
        self.new as i64 - self.old as i64
    }
}

fn slot(dragon: &mut DragonRecord, stat: StatKind) -> (&mut u32, u32) {
    let max_health = dragon.max_health;
    match stat {
        StatKind::Health => (&mut dragon.health, max_health),
        StatKind::Hunger => (&mut dragon.hunger, STAT_CAP),
        StatKind::Energy => (&mut dragon.energy, STAT_CAP),
        StatKind::Mood => (&mut dragon.mood, STAT_CAP),
        StatKind::Experience => (&mut dragon.exp, u32::MAX),
        StatKind::Attribute(attr) => (dragon.attribute_mut(attr), ATTRIBUTE_CAP),
    }
}

/// Shift `stat` by `delta`, clamped into its range.
pub fn adjust(dragon: &mut DragonRecord, stat: StatKind, delta: i64) -> StatDelta {
    let (value, cap) = slot(dragon, stat);
    let old = *value;
    *value = (old as i64 + delta).clamp(0, cap as i64) as u32;
    StatDelta {
        stat,
        old,
        new: *value,
    }
}

/// Like [`adjust`] for losses that must leave the dragon standing (combat, starvation).
pub fn wound(dragon: &mut DragonRecord, amount: u32) -> StatDelta {
    let old = dragon.health;
    dragon.health = old.saturating_sub(amount).max(1).min(dragon.max_health.max(1));
    StatDelta {
        stat: StatKind::Health,
        old,
        new: dragon.health,
    }
}

/// Force every bounded stat back into range. Used after loading stored records.
pub fn clamp_all(dragon: &mut DragonRecord) {
    dragon.max_health = dragon.max_health.max(1);
    dragon.health = dragon.health.min(dragon.max_health);
    dragon.hunger = dragon.hunger.min(STAT_CAP);
    dragon.energy = dragon.energy.min(STAT_CAP);
    dragon.mood = dragon.mood.min(STAT_CAP);
    dragon.level = dragon.level.max(1);
    for attr in [
        Attribute::Strength,
        Attribute::Endurance,
        Attribute::Intelligence,
        Attribute::Charisma,
    ] {
        let value = dragon.attribute_mut(attr);
        *value = (*value).min(ATTRIBUTE_CAP);
    }
}

/// Result of consuming one item on a dragon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemApplication {
    pub item_id: String,
    pub item_name: String,
    pub deltas: Vec<StatDelta>,
    pub level_up: Option<LevelUp>,
    /// Path awakened by this use, if a mutation triggered.
    pub mutation: Option<EvolutionPath>,
}

/// Consume one `item_id` from the player's inventory and apply its effects to the dragon.
///
/// Fails with `ItemNotOwned` before anything changes when the player holds none, and
/// with `UnknownItem` when the id is held but missing from the catalog.
pub fn apply_item<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    item_id: &str,
    rng: &mut R,
) -> Result<ItemApplication, GameError> {
    let item_id = item_id.trim().to_ascii_lowercase();
    if player.item_count(&item_id) == 0 {
        return Err(GameError::ItemNotOwned(item_id));
    }
    let def = catalog::item(&item_id).ok_or_else(|| GameError::UnknownItem(item_id.clone()))?;
    if !player.take_item(&item_id) {
        return Err(GameError::ItemNotOwned(item_id));
    }

    let mut application = ItemApplication {
        item_id: def.id.to_string(),
        item_name: def.name.to_string(),
        deltas: Vec::new(),
        level_up: None,
        mutation: None,
    };

    for effect in def.effects {
        match *effect {
            ItemEffect::Hunger(n) => application.deltas.push(adjust(dragon, StatKind::Hunger, n as i64)),
            ItemEffect::Health(n) => application.deltas.push(adjust(dragon, StatKind::Health, n as i64)),
            ItemEffect::Energy(n) => application.deltas.push(adjust(dragon, StatKind::Energy, n as i64)),
            ItemEffect::Mood(n) => application.deltas.push(adjust(dragon, StatKind::Mood, n as i64)),
            ItemEffect::Boost(attr, n) => {
                application
                    .deltas
                    .push(adjust(dragon, StatKind::Attribute(attr), n as i64))
            }
            ItemEffect::Experience(n) => {
                let old = dragon.exp;
                application.level_up = progression::add_experience(dragon, n);
                application.deltas.push(StatDelta {
                    stat: StatKind::Experience,
                    old,
                    new: dragon.exp,
                });
            }
            ItemEffect::Mutation { path, chance } => {
                let Some(ability) = path.ability() else {
                    continue;
                };
                if dragon.has_ability(ability) || !rng.gen_bool(chance.clamp(0.0, 1.0)) {
                    continue;
                }
                dragon.path = path;
                dragon.mutations.insert(path);
                dragon.abilities.insert(ability);
                application.mutation = Some(path);
            }
        }
    }

    Ok(application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Ability, DragonOwner};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixtures() -> (DragonRecord, PlayerRecord) {
        let now = Utc::now();
        (
            DragonRecord::new(DragonOwner::World, "Ember", now),
            PlayerRecord::new("u1", "Ann", 100, now),
        )
    }

    #[test]
    fn adjust_clamps_both_ends() {
        let (mut dragon, _) = fixtures();
        let up = adjust(&mut dragon, StatKind::Hunger, 500);
        assert_eq!(up.new, STAT_CAP);
        let down = adjust(&mut dragon, StatKind::Mood, -500);
        assert_eq!(down.new, 0);
        let health = adjust(&mut dragon, StatKind::Health, 50);
        assert_eq!(health.new, dragon.max_health);
    }

    #[test]
    fn wound_leaves_one_health() {
        let (mut dragon, _) = fixtures();
        let delta = wound(&mut dragon, 1_000);
        assert_eq!(delta.new, 1);
    }

    #[test]
    fn bread_restores_hunger_and_consumes_one() {
        let (mut dragon, mut player) = fixtures();
        player.add_item("bread", 2);
        let mut rng = StdRng::seed_from_u64(1);
        let applied = apply_item(&mut dragon, &mut player, "bread", &mut rng).unwrap();
        assert_eq!(dragon.hunger, 60);
        assert_eq!(player.item_count("bread"), 1);
        assert_eq!(applied.deltas[0].old, 50);
        assert_eq!(applied.deltas[0].new, 60);
    }

    #[test]
    fn unowned_item_changes_nothing() {
        let (mut dragon, mut player) = fixtures();
        let before = dragon.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let err = apply_item(&mut dragon, &mut player, "meat", &mut rng).unwrap_err();
        assert!(matches!(err, GameError::ItemNotOwned(_)));
        assert_eq!(dragon, before);
    }

    #[test]
    fn held_but_uncatalogued_item_is_unknown() {
        let (mut dragon, mut player) = fixtures();
        player.add_item("cake", 1);
        let mut rng = StdRng::seed_from_u64(1);
        let err = apply_item(&mut dragon, &mut player, "cake", &mut rng).unwrap_err();
        assert!(matches!(err, GameError::UnknownItem(_)));
        assert_eq!(player.item_count("cake"), 1);
    }

    #[test]
    fn crystal_experience_can_level_up() {
        let (mut dragon, mut player) = fixtures();
        dragon.exp = 60;
        player.add_item("ancient_crystal", 1);
        let mut rng = StdRng::seed_from_u64(1);
        let applied = apply_item(&mut dragon, &mut player, "ancient_crystal", &mut rng).unwrap();
        assert_eq!(dragon.level, 2);
        assert_eq!(dragon.exp, 10);
        assert!(applied.level_up.is_some());
    }

    #[test]
    fn mutation_sets_path_and_ability_once() {
        let (mut dragon, mut player) = fixtures();
        player.add_item("fire_stone", 50);
        let mut rng = StdRng::seed_from_u64(3);
        let mut triggered = 0;
        for _ in 0..50 {
            let applied = apply_item(&mut dragon, &mut player, "fire_stone", &mut rng).unwrap();
            if applied.mutation.is_some() {
                triggered += 1;
            }
        }
        assert_eq!(triggered, 1);
        assert_eq!(dragon.path, EvolutionPath::Fire);
        assert!(dragon.has_ability(Ability::FireBreath));
    }

    #[test]
    fn last_mutation_overwrites_path() {
        let (mut dragon, mut player) = fixtures();
        dragon.abilities.insert(Ability::FireBreath);
        dragon.path = EvolutionPath::Fire;
        player.add_item("shadow_cloak", 60);
        let mut rng = StdRng::seed_from_u64(9);
        while !dragon.has_ability(Ability::Invisibility) {
            apply_item(&mut dragon, &mut player, "shadow_cloak", &mut rng).unwrap();
        }
        assert_eq!(dragon.path, EvolutionPath::Shadow);
        assert!(dragon.has_ability(Ability::FireBreath));
    }

    #[test]
    fn clamp_all_repairs_out_of_range_values() {
        let (mut dragon, _) = fixtures();
        dragon.hunger = 400;
        dragon.health = 9_000;
        dragon.level = 0;
        clamp_all(&mut dragon);
        assert_eq!(dragon.hunger, STAT_CAP);
        assert_eq!(dragon.health, dragon.max_health);
        assert_eq!(dragon.level, 1);
    }
}
