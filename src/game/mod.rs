//! Dragon game core: data model, Sled-backed persistence, the rule resolvers
//! and the async engine that ties them together under per-entity locks.
//! Transports only need [`parse_command`], [`GameEngine::execute`] and
//! [`render_outcome`].

pub mod actions;
pub mod boss;
pub mod catalog;
pub mod clock;
pub mod combat;
pub mod commands;
pub mod duel;
pub mod economy;
pub mod engine;
pub mod errors;
pub mod flavor;
pub mod locks;
pub mod maintenance;
pub mod progression;
pub mod render;
pub mod stats;
pub mod storage;
pub mod types;

pub use actions::{ActionKind, ActionReport};
pub use boss::{BossHit, BossReward, BossSettings};
pub use catalog::{Encounter, ItemDef, Location, Monster, ITEMS, MONSTERS};
pub use clock::{AccrualRates, Clock, ManualClock, SystemClock};
pub use combat::{BattleReport, BattleResult, MonsterFight};
pub use commands::{parse_callback, parse_command, CommandError, GameCommand};
pub use duel::{DuelOutcome, DuelSettings};
pub use economy::{DailyBonus, LeaderboardEntry, Purchase};
pub use engine::{
    Actor, BossAttack, DragonMode, GameEngine, GameSettings, MaintenanceReport, Outcome,
};
pub use errors::GameError;
pub use locks::EntityLocks;
pub use maintenance::{spawn_maintenance, MaintenanceConfig};
pub use progression::LevelUp;
pub use render::{render_error, render_outcome, HELP_TEXT};
pub use stats::{StatDelta, StatKind};
pub use storage::{DragonStore, DragonStoreBuilder, WriteSet};
pub use types::*;
