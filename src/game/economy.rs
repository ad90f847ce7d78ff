//! Gold and inventory: shop purchases, the daily bonus and the leaderboard.

use chrono::NaiveDate;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::Serialize;

use crate::game::catalog;
use crate::game::errors::GameError;
use crate::game::progression::{self, LevelUp};
use crate::game::types::PlayerRecord;

pub const DAILY_GOLD_MIN: u32 = 20;
pub const DAILY_GOLD_MAX: u32 = 50;
pub const DAILY_EXP_MIN: u32 = 10;
pub const DAILY_EXP_MAX: u32 = 30;
pub const DAILY_ITEM_CHANCE: f64 = 0.1;
pub const DAILY_ITEM_MAX_PRICE: u32 = 50;
pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub item_id: String,
    pub item_name: String,
    pub price: u32,
    pub gold_left: u32,
    pub owned: u32,
}

/// Buy one unit of `item_id`. Nothing changes unless the purchase succeeds.
pub fn buy(player: &mut PlayerRecord, item_id: &str) -> Result<Purchase, GameError> {
    let def = catalog::item(item_id.trim())
        .ok_or_else(|| GameError::UnknownItem(item_id.trim().to_string()))?;
    if player.gold < def.price {
        return Err(GameError::InsufficientGold {
            needed: def.price,
            available: player.gold,
        });
    }
    player.gold -= def.price;
    player.add_item(def.id, 1);
    Ok(Purchase {
        item_id: def.id.to_string(),
        item_name: def.name.to_string(),
        price: def.price,
        gold_left: player.gold,
        owned: player.item_count(def.id),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBonus {
    pub gold: u32,
    pub exp: u32,
    pub item: Option<String>,
    pub level_up: Option<LevelUp>,
}

/// Claim the once-per-day bonus for the calendar date `today`.
pub fn claim_daily<R: Rng + ?Sized>(
    player: &mut PlayerRecord,
    today: NaiveDate,
    rng: &mut R,
) -> Result<DailyBonus, GameError> {
    if player.last_daily == Some(today) {
        return Err(GameError::AlreadyClaimedToday);
    }
    let gold = rng.gen_range(DAILY_GOLD_MIN..=DAILY_GOLD_MAX);
    let exp = rng.gen_range(DAILY_EXP_MIN..=DAILY_EXP_MAX);
    player.gold = player.gold.saturating_add(gold);
    let level_up = progression::add_player_experience(player, exp);
    let item = if rng.gen_bool(DAILY_ITEM_CHANCE) {
        catalog::items_up_to(DAILY_ITEM_MAX_PRICE)
            .choose(rng)
            .map(|def| def.id.to_string())
    } else {
        None
    };
    if let Some(id) = &item {
        player.add_item(id, 1);
    }
    player.last_daily = Some(today);
    Ok(DailyBonus {
        gold,
        exp,
        item,
        level_up,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: String,
    pub display_name: String,
    pub reputation: i32,
    pub level: u32,
    pub gold: u32,
    pub wins: u32,
    pub losses: u32,
}

/// Rank players by reputation, then level, then gold. Ties keep id order.
pub fn leaderboard(mut players: Vec<PlayerRecord>, limit: usize) -> Vec<LeaderboardEntry> {
    players.sort_by(|a, b| {
        b.reputation
            .cmp(&a.reputation)
            .then(b.level.cmp(&a.level))
            .then(b.gold.cmp(&a.gold))
            .then(a.id.cmp(&b.id))
    });
    players
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: i + 1,
            player_id: p.id,
            display_name: p.display_name,
            reputation: p.reputation,
            level: p.level,
            gold: p.gold,
            wins: p.pvp_wins,
            losses: p.pvp_losses,
        })
        .collect()
}
