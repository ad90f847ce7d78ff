//! Care and adventure actions applied to a dragon on behalf of a player.
//!
//! Every action checks its preconditions before touching any state, so a failed
//! action leaves both records unchanged.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::catalog::{self, Encounter, Location};
use crate::game::combat::{self, MonsterFight};
use crate::game::errors::GameError;
use crate::game::flavor::{self, FlavorAction};
use crate::game::progression::{self, LevelUp};
use crate::game::stats::{self, StatDelta, StatKind};
use crate::game::types::{Attribute, DragonRecord, EvolutionPath, PlayerRecord};
use crate::validation;

pub const FEED_AFFECTION: i32 = 5;

pub const PLAY_ENERGY_COST: u32 = 10;
pub const PLAY_MOOD_MIN: u32 = 5;
pub const PLAY_MOOD_MAX: u32 = 15;
pub const PLAY_AFFECTION: i32 = 2;

pub const REST_ENERGY: u32 = 30;
pub const REST_HEALTH: u32 = 5;
pub const REST_HEAL_AFFECTION_ABOVE: i32 = 50;

pub const TRAIN_ENERGY_COST: u32 = 15;
pub const TRAIN_EXP_MIN: u32 = 10;
pub const TRAIN_EXP_MAX: u32 = 25;
pub const TRAIN_STAT_CHANCE: f64 = 0.2;
const TRAINABLE: [Attribute; 3] = [Attribute::Strength, Attribute::Endurance, Attribute::Intelligence];

pub const QUEST_ENERGY_COST: u32 = 20;
pub const QUEST_SUCCESS_CHANCE: f64 = 0.75;
pub const QUEST_GOLD_MIN: u32 = 10;
pub const QUEST_GOLD_MAX: u32 = 50;
pub const QUEST_EXP_MIN: u32 = 15;
pub const QUEST_EXP_MAX: u32 = 40;
pub const QUEST_ITEM_CHANCE: f64 = 0.25;

pub const EXPLORE_ENERGY_COST: u32 = 20;
pub const TREASURE_GOLD_MIN: u32 = 10;
pub const TREASURE_GOLD_MAX: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Feed,
    Play,
    Rest,
    Train,
    Quest,
    Explore,
    Rename,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Feed => "feed",
            ActionKind::Play => "play",
            ActionKind::Rest => "rest",
            ActionKind::Train => "train",
            ActionKind::Quest => "quest",
            ActionKind::Explore => "explore",
            ActionKind::Rename => "rename",
        }
    }
}

/// What an action changed, in a form the chat layer can render.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub kind: ActionKind,
    pub dragon_name: String,
    pub deltas: Vec<StatDelta>,
    pub gold: i64,
    pub affection: i32,
    pub player_exp: u32,
    pub level_up: Option<LevelUp>,
    pub player_level_up: Option<LevelUp>,
    pub mutation: Option<EvolutionPath>,
    pub items_found: Vec<String>,
    pub encounter: Option<Encounter>,
    pub fight: Option<MonsterFight>,
    /// Whether a quest succeeded. Always true for other actions.
    pub success: bool,
    pub flavor: Option<&'static str>,
}

impl ActionReport {
    fn new(kind: ActionKind, dragon: &DragonRecord) -> Self {
        Self {
            kind,
            dragon_name: dragon.name.clone(),
            deltas: Vec::new(),
            gold: 0,
            affection: 0,
            player_exp: 0,
            level_up: None,
            player_level_up: None,
            mutation: None,
            items_found: Vec::new(),
            encounter: None,
            fight: None,
            success: true,
            flavor: None,
        }
    }

    fn grant_exp(&mut self, dragon: &mut DragonRecord, amount: u32) {
        let old = dragon.exp;
        self.level_up = progression::add_experience(dragon, amount);
        self.deltas.push(StatDelta {
            stat: StatKind::Experience,
            old,
            new: dragon.exp,
        });
    }

    fn grant_gold(&mut self, player: &mut PlayerRecord, amount: u32) {
        player.gold = player.gold.saturating_add(amount);
        self.gold += amount as i64;
    }

    fn grant_affection(&mut self, player: &mut PlayerRecord, amount: i32) {
        player.affection = player.affection.saturating_add(amount);
        self.affection += amount;
    }
}

fn require_energy(dragon: &DragonRecord, cost: u32) -> Result<(), GameError> {
    if dragon.energy < cost {
        return Err(GameError::InsufficientEnergy {
            needed: cost,
            available: dragon.energy,
        });
    }
    Ok(())
}

fn spend_energy(report: &mut ActionReport, dragon: &mut DragonRecord, cost: u32) {
    report
        .deltas
        .push(stats::adjust(dragon, StatKind::Energy, -(cost as i64)));
}

fn forage<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    catalog::FORAGE_ITEMS
        .choose(rng)
        .copied()
        .unwrap_or("healing_herb")
}

/// Feed the dragon one item from the player's inventory.
pub fn feed<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    item_id: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    let applied = stats::apply_item(dragon, player, item_id, rng)?;
    let mut report = ActionReport::new(ActionKind::Feed, dragon);
    report.deltas = applied.deltas;
    report.level_up = applied.level_up;
    report.mutation = applied.mutation;
    report.grant_affection(player, FEED_AFFECTION);
    dragon.last_fed = now;
    dragon.last_interaction = now;
    report.flavor = Some(flavor::response(
        FlavorAction::Feed,
        dragon.mood,
        dragon.hunger,
        player.affection,
        rng,
    ));
    Ok(report)
}

pub fn play<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    require_energy(dragon, PLAY_ENERGY_COST)?;
    let mut report = ActionReport::new(ActionKind::Play, dragon);
    spend_energy(&mut report, dragon, PLAY_ENERGY_COST);
    let mood = rng.gen_range(PLAY_MOOD_MIN..=PLAY_MOOD_MAX);
    report
        .deltas
        .push(stats::adjust(dragon, StatKind::Mood, mood as i64));
    report.grant_affection(player, PLAY_AFFECTION);
    dragon.last_interaction = now;
    report.flavor = Some(flavor::response(
        FlavorAction::Play,
        dragon.mood,
        dragon.hunger,
        player.affection,
        rng,
    ));
    Ok(report)
}

/// Restore energy. A full dragon simply reports a zero change.
pub fn rest<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &PlayerRecord,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    let mut report = ActionReport::new(ActionKind::Rest, dragon);
    report
        .deltas
        .push(stats::adjust(dragon, StatKind::Energy, REST_ENERGY as i64));
    if player.affection > REST_HEAL_AFFECTION_ABOVE {
        report
            .deltas
            .push(stats::adjust(dragon, StatKind::Health, REST_HEALTH as i64));
    }
    dragon.last_interaction = now;
    report.flavor = Some(flavor::response(
        FlavorAction::Rest,
        dragon.mood,
        dragon.hunger,
        player.affection,
        rng,
    ));
    Ok(report)
}

pub fn train<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    require_energy(dragon, TRAIN_ENERGY_COST)?;
    let mut report = ActionReport::new(ActionKind::Train, dragon);
    spend_energy(&mut report, dragon, TRAIN_ENERGY_COST);
    let exp = rng.gen_range(TRAIN_EXP_MIN..=TRAIN_EXP_MAX);
    report.grant_exp(dragon, exp);
    if rng.gen_bool(TRAIN_STAT_CHANCE) {
        if let Some(attr) = TRAINABLE.choose(rng) {
            report
                .deltas
                .push(stats::adjust(dragon, StatKind::Attribute(*attr), 1));
        }
    }
    dragon.last_interaction = now;
    Ok(report)
}

/// Send the dragon on a quest. Energy and the cooldown are spent whether or not it succeeds.
pub fn quest<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    now: DateTime<Utc>,
    cooldown_secs: i64,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    if let Some(last) = player.last_quest_at {
        let since = now.signed_duration_since(last).num_seconds();
        if since < cooldown_secs {
            return Err(GameError::OnCooldown {
                remaining_secs: cooldown_secs - since,
            });
        }
    }
    require_energy(dragon, QUEST_ENERGY_COST)?;

    let mut report = ActionReport::new(ActionKind::Quest, dragon);
    spend_energy(&mut report, dragon, QUEST_ENERGY_COST);
    player.last_quest_at = Some(now);
    dragon.last_interaction = now;

    report.success = rng.gen_bool(QUEST_SUCCESS_CHANCE);
    if report.success {
        let gold = rng.gen_range(QUEST_GOLD_MIN..=QUEST_GOLD_MAX);
        report.grant_gold(player, gold);
        let exp = rng.gen_range(QUEST_EXP_MIN..=QUEST_EXP_MAX);
        report.grant_exp(dragon, exp);
        if rng.gen_bool(QUEST_ITEM_CHANCE) {
            let found = forage(rng);
            player.add_item(found, 1);
            report.items_found.push(found.to_string());
        }
    }
    Ok(report)
}

pub fn explore<R: Rng + ?Sized>(
    dragon: &mut DragonRecord,
    player: &mut PlayerRecord,
    location: Location,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ActionReport, GameError> {
    require_energy(dragon, EXPLORE_ENERGY_COST)?;
    let mut report = ActionReport::new(ActionKind::Explore, dragon);
    spend_energy(&mut report, dragon, EXPLORE_ENERGY_COST);
    dragon.last_interaction = now;

    let encounter = location.roll_encounter(rng);
    report.encounter = Some(encounter);
    match encounter {
        Encounter::Monster => {
            let monster = location.roll_monster(rng);
            let fight = combat::fight_monster(dragon, player, monster, rng, combat::MAX_ROUNDS);
            report.gold += fight.gold as i64;
            report.player_exp = fight.player_exp;
            report.level_up = fight.level_up.clone();
            report.player_level_up = fight.player_level_up.clone();
            report.deltas.extend(fight.deltas.iter().copied());
            report.success = fight.victory;
            report.fight = Some(fight);
        }
        Encounter::Treasure => {
            let gold = rng.gen_range(TREASURE_GOLD_MIN..=TREASURE_GOLD_MAX);
            report.grant_gold(player, gold);
        }
        Encounter::Herbs => {
            let found = forage(rng);
            player.add_item(found, 1);
            report.items_found.push(found.to_string());
        }
        Encounter::Nothing => {}
    }
    Ok(report)
}

pub fn rename(
    dragon: &mut DragonRecord,
    new_name: &str,
    now: DateTime<Utc>,
) -> Result<ActionReport, GameError> {
    let name = validation::validate_dragon_name(new_name)
        .map_err(|e| GameError::InvalidName(e.to_string()))?;
    dragon.name = name;
    dragon.last_interaction = now;
    Ok(ActionReport::new(ActionKind::Rename, dragon))
}
