//! Round-based battle simulation shared by monster fights and duels.
//!
//! Each round the left side strikes first, then the right side if still standing.
//! A battle ends when either side drops to zero or the round cap is reached; at the
//! cap the side with more remaining health wins and equal health is a draw.

use std::collections::BTreeSet;

use rand::Rng;

use crate::game::catalog::Monster;
use crate::game::progression::{self, LevelUp};
use crate::game::stats::{self, StatDelta, StatKind};
use crate::game::types::{Ability, DragonRecord, PlayerRecord};

pub const MAX_ROUNDS: u32 = 20;
pub const CRIT_CHANCE: f64 = 0.10;
pub const TELEPATHY_CRIT_BONUS: f64 = 0.05;
pub const CRIT_MULTIPLIER: u32 = 2;
pub const FIRE_BREATH_BONUS: u32 = 5;
/// Fury triggers below this share of max health, in percent.
pub const FURY_BELOW_PERCENT: u32 = 30;
pub const DODGE_CAP_PERCENT: u32 = 40;
pub const INVISIBILITY_DODGE_BONUS: u32 = 10;
pub const DEFEAT_MOOD_PENALTY: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub defense: u32,
    pub dodge_percent: u32,
    pub abilities: BTreeSet<Ability>,
}

impl Combatant {
    pub fn from_dragon(dragon: &DragonRecord) -> Self {
        let mut dodge = dragon.intelligence.min(DODGE_CAP_PERCENT);
        if dragon.has_ability(Ability::Invisibility) {
            dodge += INVISIBILITY_DODGE_BONUS;
        }
        Self {
            name: dragon.name.clone(),
            health: dragon.health,
            max_health: dragon.max_health.max(1),
            attack: dragon.strength,
            defense: dragon.endurance / 2,
            dodge_percent: dodge,
            abilities: dragon.abilities.clone(),
        }
    }

    /// Monsters have no defense, no dodge and no abilities.
    pub fn from_monster(monster: &Monster) -> Self {
        Self {
            name: monster.name.to_string(),
            health: monster.health,
            max_health: monster.health.max(1),
            attack: monster.attack,
            defense: 0,
            dodge_percent: 0,
            abilities: BTreeSet::new(),
        }
    }

    fn has(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    fn furious(&self) -> bool {
        self.has(Ability::Fury) && self.health * 100 < self.max_health * FURY_BELOW_PERCENT
    }

    pub fn is_down(&self) -> bool {
        self.health == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleResult {
    Winner(Side),
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub round: u32,
    pub attacker: Side,
    pub damage: u32,
    pub critical: bool,
    pub dodged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleReport {
    pub left_name: String,
    pub right_name: String,
    pub hits: Vec<Hit>,
    pub rounds: u32,
    pub left_health: u32,
    pub right_health: u32,
    pub result: BattleResult,
    pub decided_by_cap: bool,
}

fn strike<R: Rng + ?Sized>(
    attacker: &Combatant,
    defender: &mut Combatant,
    round: u32,
    side: Side,
    rng: &mut R,
) -> Hit {
    if defender.dodge_percent > 0 && rng.gen_range(0..100) < defender.dodge_percent {
        return Hit {
            round,
            attacker: side,
            damage: 0,
            critical: false,
            dodged: true,
        };
    }
    let jitter: i64 = rng.gen_range(-2..=3);
    let mut damage = (attacker.attack as i64 + jitter - defender.defense as i64).max(1) as u32;
    if attacker.has(Ability::FireBreath) {
        damage += FIRE_BREATH_BONUS;
    }
    let mut crit_chance = CRIT_CHANCE;
    if attacker.has(Ability::Telepathy) {
        crit_chance += TELEPATHY_CRIT_BONUS;
    }
    let critical = rng.gen_bool(crit_chance);
    if critical {
        damage *= CRIT_MULTIPLIER;
    }
    if attacker.furious() {
        damage = damage * 3 / 2;
    }
    defender.health = defender.health.saturating_sub(damage);
    Hit {
        round,
        attacker: side,
        damage,
        critical,
        dodged: false,
    }
}

/// Run a battle to completion with `left` opening every round.
/// Always terminates within `max_rounds`.
pub fn simulate<R: Rng + ?Sized>(
    left: Combatant,
    right: Combatant,
    rng: &mut R,
    max_rounds: u32,
) -> BattleReport {
    simulate_from(left, right, Side::Left, rng, max_rounds)
}

/// Like [`simulate`], but `opener` strikes first in every round.
pub fn simulate_from<R: Rng + ?Sized>(
    mut left: Combatant,
    mut right: Combatant,
    opener: Side,
    rng: &mut R,
    max_rounds: u32,
) -> BattleReport {
    let mut hits = Vec::new();
    let mut rounds = 0;
    while rounds < max_rounds.max(1) && !left.is_down() && !right.is_down() {
        rounds += 1;
        for side in [opener, opener.other()] {
            let hit = match side {
                Side::Left => strike(&left, &mut right, rounds, side, rng),
                Side::Right => strike(&right, &mut left, rounds, side, rng),
            };
            hits.push(hit);
            if left.is_down() || right.is_down() {
                break;
            }
        }
    }

    let decided_by_cap = !left.is_down() && !right.is_down();
    let result = if right.is_down() {
        BattleResult::Winner(Side::Left)
    } else if left.is_down() {
        BattleResult::Winner(Side::Right)
    } else if left.health > right.health {
        BattleResult::Winner(Side::Left)
    } else if right.health > left.health {
        BattleResult::Winner(Side::Right)
    } else {
        BattleResult::Draw
    };

    BattleReport {
        left_name: left.name,
        right_name: right.name,
        hits,
        rounds,
        left_health: left.health,
        right_health: right.health,
        result,
        decided_by_cap,
    }
}

/// Outcome of a dragon fighting a catalog monster.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterFight {
    pub monster: &'static Monster,
    pub report: BattleReport,
    pub victory: bool,
    pub gold: u32,
    pub dragon_exp: u32,
    pub player_exp: u32,
    pub level_up: Option<LevelUp>,
    pub player_level_up: Option<LevelUp>,
    pub deltas: Vec<StatDelta>,
}

/// Fight `monster` and apply the result to the dragon and player.
///
/// Only a knockout counts as a victory; running out of rounds is treated as a defeat.
pub fn fight_monster<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    monster: &'static Monster,
    rng: &mut R,
    max_rounds: u32,
) -> MonsterFight {
    let report = simulate(
        Combatant::from_dragon(dragon),
        Combatant::from_monster(monster),
        rng,
        max_rounds,
    );
    let victory = report.result == BattleResult::Winner(Side::Left) && report.right_health == 0;
    let mut fight = MonsterFight {
        monster,
        victory,
        gold: 0,
        dragon_exp: 0,
        player_exp: 0,
        level_up: None,
        player_level_up: None,
        deltas: Vec::new(),
        report,
    };

    if victory {
        let old = dragon.health;
        dragon.health = fight.report.left_health.clamp(1, dragon.max_health.max(1));
        fight.deltas.push(StatDelta {
            stat: StatKind::Health,
            old,
            new: dragon.health,
        });
        fight.gold = monster.gold;
        player.gold = player.gold.saturating_add(monster.gold);
        fight.dragon_exp = monster.exp;
        fight.level_up = progression::add_experience(dragon, monster.exp);
        fight.player_exp = monster.exp / 2;
        fight.player_level_up = progression::add_player_experience(player, fight.player_exp);
    } else {
        let damage = rng.gen_range(10..=20);
        fight.deltas.push(stats::wound(dragon, damage));
        fight
            .deltas
            .push(stats::adjust(dragon, StatKind::Mood, -DEFEAT_MOOD_PENALTY));
    }
    fight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{monster, MONSTERS};
    use crate::game::types::DragonOwner;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fighter(name: &str, health: u32, attack: u32, defense: u32) -> Combatant {
        Combatant {
            name: name.to_string(),
            health,
            max_health: health,
            attack,
            defense,
            dodge_percent: 0,
            abilities: BTreeSet::new(),
        }
    }

    #[test]
    fn stalemate_is_capped() {
        let mut rng = StdRng::seed_from_u64(1);
        let report = simulate(
            fighter("a", 1_000_000, 1, 100),
            fighter("b", 1_000_000, 1, 100),
            &mut rng,
            MAX_ROUNDS,
        );
        assert_eq!(report.rounds, MAX_ROUNDS);
        assert!(report.decided_by_cap);
    }

    #[test]
    fn equal_health_at_cap_is_a_draw() {
        let mut rng = StdRng::seed_from_u64(1);
        // Both sides always dodge, so nobody takes damage.
        let mut a = fighter("a", 50, 5, 0);
        let mut b = fighter("b", 50, 5, 0);
        a.dodge_percent = 100;
        b.dodge_percent = 100;
        let report = simulate(a, b, &mut rng, 3);
        assert_eq!(report.result, BattleResult::Draw);
        assert!(report.hits.iter().all(|h| h.dodged));
    }

    #[test]
    fn opener_strikes_first_each_round() {
        let mut rng = StdRng::seed_from_u64(3);
        let report = simulate_from(
            fighter("a", 1_000, 5, 0),
            fighter("b", 1_000, 5, 0),
            Side::Right,
            &mut rng,
            4,
        );
        assert_eq!(report.hits.len(), 8);
        for pair in report.hits.chunks(2) {
            assert_eq!(pair[0].attacker, Side::Right);
            assert_eq!(pair[1].attacker, Side::Left);
        }
    }

    #[test]
    fn knockout_by_opener_ends_the_round() {
        let mut rng = StdRng::seed_from_u64(3);
        let report = simulate_from(
            fighter("a", 1, 5, 0),
            fighter("b", 1_000, 50, 0),
            Side::Right,
            &mut rng,
            MAX_ROUNDS,
        );
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.result, BattleResult::Winner(Side::Right));
    }

    #[test]
    fn minimum_damage_is_one() {
        let mut rng = StdRng::seed_from_u64(2);
        let report = simulate(fighter("a", 10, 0, 0), fighter("b", 10, 0, 500), &mut rng, 1);
        let first = &report.hits[0];
        assert!(first.damage >= 1);
    }

    #[test]
    fn strong_dragon_beats_wolf() {
        let now = Utc::now();
        let mut dragon = DragonRecord::new(DragonOwner::World, "Ember", now);
        dragon.strength = 60;
        dragon.endurance = 40;
        let mut player = PlayerRecord::new("u1", "Ann", 0, now);
        let mut rng = StdRng::seed_from_u64(4);
        let wolf = monster("forest_wolf").unwrap();
        let fight = fight_monster(&mut dragon, &mut player, wolf, &mut rng, MAX_ROUNDS);
        assert!(fight.victory);
        assert_eq!(player.gold, wolf.gold);
        assert_eq!(dragon.exp, wolf.exp);
        assert_eq!(player.exp, wolf.exp / 2);
        assert!(dragon.health >= 1);
    }

    #[test]
    fn defeat_never_kills() {
        let now = Utc::now();
        let mut dragon = DragonRecord::new(DragonOwner::World, "Ember", now);
        dragon.strength = 0;
        dragon.endurance = 0;
        dragon.intelligence = 0;
        dragon.health = 5;
        let mut player = PlayerRecord::new("u1", "Ann", 0, now);
        let mut rng = StdRng::seed_from_u64(8);
        let golem = MONSTERS.last().unwrap();
        let fight = fight_monster(&mut dragon, &mut player, golem, &mut rng, MAX_ROUNDS);
        assert!(!fight.victory);
        assert_eq!(dragon.health, 1);
        assert_eq!(dragon.mood, 60);
        assert_eq!(player.gold, 0);
    }
}
