//! Plain-text rendering of engine outcomes and user-facing errors.

use std::fmt::Write;

use crate::game::actions::{ActionKind, ActionReport};
use crate::game::catalog::{self, Encounter, Location, ITEMS};
use crate::game::combat::{BattleResult, Side};
use crate::game::engine::{BossAttack, Outcome};
use crate::game::errors::GameError;
use crate::game::flavor;
use crate::game::progression::{self, LevelUp};
use crate::game::stats::StatDelta;
use crate::game::types::{BossRecord, DragonRecord, DuelRecord, PlayerRecord, STAT_CAP};

pub const HELP_TEXT: &str = "\
Commands:
  status              how the dragon is doing
  feed <item>         feed an item from your bag
  buy <item> / shop   the market
  play | rest | train care for the dragon
  quest               send the dragon on a quest
  adventure [forest|ruins]
  daily               claim the daily bonus
  profile | inventory | top
  rename <name>       give the dragon a new name
  duel <player> | duel accept <id> | duel decline <id> | duels
  boss | boss attack  the world boss";

fn delta_line(out: &mut String, delta: &StatDelta) {
    let _ = writeln!(
        out,
        "  {}: {} -> {} ({:+})",
        delta.stat.label(),
        delta.old,
        delta.new,
        delta.change()
    );
}

fn level_line(out: &mut String, who: &str, up: &LevelUp) {
    let _ = writeln!(out, "{} reached level {}!", who, up.to);
    for ability in &up.unlocked {
        let _ = writeln!(out, "New ability: {}", ability.display_name());
    }
}

fn render_dragon(dragon: &DragonRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} path), level {}", dragon.name, dragon.path.label(), dragon.level);
    let _ = writeln!(out, "  Experience: {}/{}", dragon.exp, progression::threshold(dragon.level));
    let _ = writeln!(out, "  Health: {}/{}", dragon.health, dragon.max_health);
    let _ = writeln!(out, "  Satiety: {}/{}", dragon.hunger, STAT_CAP);
    let _ = writeln!(out, "  Energy: {}/{}", dragon.energy, STAT_CAP);
    let _ = writeln!(out, "  Mood: {}/{} ({})", dragon.mood, STAT_CAP, flavor::mood_word(dragon.mood));
    let _ = writeln!(
        out,
        "  STR {} END {} INT {} CHA {}",
        dragon.strength, dragon.endurance, dragon.intelligence, dragon.charisma
    );
    let abilities: Vec<&str> = dragon.abilities.iter().map(|a| a.display_name()).collect();
    let _ = write!(out, "  Abilities: {}", abilities.join(", "));
    out
}

fn render_player(player: &PlayerRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", player.display_name);
    let _ = writeln!(out, "  Gold: {}", player.gold);
    let _ = writeln!(
        out,
        "  Level {} ({}/{} exp)",
        player.level,
        player.exp,
        progression::threshold(player.level)
    );
    let _ = writeln!(out, "  Reputation: {}", player.reputation);
    let _ = writeln!(out, "  Affection: {}", player.affection);
    let _ = write!(out, "  Duels: {} won, {} lost", player.pvp_wins, player.pvp_losses);
    out
}

fn render_inventory(player: &PlayerRecord) -> String {
    if player.inventory.is_empty() {
        return "Your bag is empty. Visit the shop.".to_string();
    }
    let mut out = String::from("Your bag:");
    for (id, count) in &player.inventory {
        let name = catalog::item(id).map(|i| i.name).unwrap_or(id.as_str());
        let _ = write!(out, "\n  {} x{} (feed {})", name, count, id);
    }
    out
}

fn render_shop(gold: u32) -> String {
    let mut out = format!("Market (you have {} gold):", gold);
    for item in ITEMS {
        let _ = write!(
            out,
            "\n  {} - {} gold: {} (buy {})",
            item.name, item.price, item.description, item.id
        );
    }
    out
}

fn render_action(report: &ActionReport) -> String {
    let mut out = String::new();
    match report.kind {
        ActionKind::Rename => {
            return format!("Your dragon is now called {}.", report.dragon_name);
        }
        ActionKind::Quest if !report.success => {
            let _ = writeln!(out, "{} came back from the quest empty-handed.", report.dragon_name);
        }
        kind => {
            let _ = writeln!(out, "{}: {}", report.dragon_name, kind.label());
        }
    }
    if let Some(encounter) = report.encounter {
        let line = match encounter {
            Encounter::Monster => None,
            Encounter::Treasure => Some("You found a hidden treasure!"),
            Encounter::Herbs => Some("You gathered something useful."),
            Encounter::Nothing => Some("The path was quiet. Nothing happened."),
        };
        if let Some(line) = line {
            let _ = writeln!(out, "{}", line);
        }
    }
    if let Some(fight) = &report.fight {
        let verdict = if fight.victory { "won against" } else { "was beaten by" };
        let _ = writeln!(
            out,
            "{} {} the {} in {} rounds.",
            report.dragon_name, verdict, fight.monster.name, fight.report.rounds
        );
    }
    for delta in &report.deltas {
        delta_line(&mut out, delta);
    }
    if report.gold != 0 {
        let _ = writeln!(out, "  Gold: {:+}", report.gold);
    }
    if report.affection != 0 {
        let _ = writeln!(out, "  Affection: {:+}", report.affection);
    }
    if report.player_exp > 0 {
        let _ = writeln!(out, "  Your experience: +{}", report.player_exp);
    }
    for item in &report.items_found {
        let name = catalog::item(item).map(|i| i.name).unwrap_or(item.as_str());
        let _ = writeln!(out, "  Found: {}", name);
    }
    if let Some(path) = report.mutation {
        let _ = writeln!(out, "A mutation! {} now follows the {} path.", report.dragon_name, path.label());
    }
    if let Some(up) = &report.level_up {
        level_line(&mut out, &report.dragon_name, up);
    }
    if let Some(up) = &report.player_level_up {
        level_line(&mut out, "You", up);
    }
    if let Some(line) = report.flavor {
        let _ = writeln!(out, "\"{}\"", line);
    }
    out.trim_end().to_string()
}

fn render_boss(boss: &BossRecord) -> String {
    let mut out = format!(
        "{} (tier {}): {}/{} HP, armor {}",
        boss.name, boss.tier, boss.hp, boss.max_hp, boss.armor
    );
    let mut ranked: Vec<(&String, &u64)> = boss.damage_ledger.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    for (id, damage) in ranked.into_iter().take(5) {
        let _ = write!(out, "\n  {}: {} damage", id, damage);
    }
    out
}

fn render_boss_attack(attack: &BossAttack) -> String {
    let mut out = String::new();
    let crit = if attack.hit.critical { " Critical hit!" } else { "" };
    let _ = writeln!(
        out,
        "You hit {} for {}.{} ({} HP left)",
        attack.boss.name, attack.hit.damage, crit, attack.hit.hp_left
    );
    delta_line(&mut out, &attack.hit.energy);
    if attack.hit.killed {
        let _ = writeln!(out, "{} has fallen! Rewards:", attack.boss.name);
        for reward in &attack.rewards {
            let _ = writeln!(
                out,
                "  {}: {} damage, +{} gold, +{} exp",
                reward.player_id, reward.damage, reward.gold, reward.exp
            );
        }
        if let Some(next) = &attack.next_boss {
            let _ = writeln!(out, "{} rises (tier {}).", next.name, next.tier);
        }
    }
    out.trim_end().to_string()
}

fn render_duel(duel: &DuelRecord) -> String {
    format!(
        "Duel {}: {} challenges {} (duel accept {} / duel decline {})",
        duel.id, duel.challenger, duel.target, duel.id, duel.id
    )
}

pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Welcome {
            player,
            dragon,
            greeting,
        } => format!(
            "Welcome, {}! You have {} gold.\n\"{}\"\n{}\nType help for commands.",
            player.display_name,
            player.gold,
            greeting,
            render_dragon(dragon)
        ),
        Outcome::Help => HELP_TEXT.to_string(),
        Outcome::Status(dragon) => render_dragon(dragon),
        Outcome::Profile(player) => render_player(player),
        Outcome::Inventory(player) => render_inventory(player),
        Outcome::Shop { gold } => render_shop(*gold),
        Outcome::Adventure => {
            let mut out = String::from("Where to?");
            for place in [Location::Forest, Location::Ruins] {
                let _ = write!(out, "\n  {} (adventure {})", place.name(), place.id());
            }
            out
        }
        Outcome::Action(report) => render_action(report),
        Outcome::Purchase(p) => format!(
            "Bought {} for {} gold. You now have {} and {} gold left.",
            p.item_name, p.price, p.owned, p.gold_left
        ),
        Outcome::Daily(bonus) => {
            let mut out = format!("Daily bonus: +{} gold, +{} exp", bonus.gold, bonus.exp);
            if let Some(item) = &bonus.item {
                let name = catalog::item(item).map(|i| i.name).unwrap_or(item.as_str());
                let _ = write!(out, ", and a {}", name);
            }
            if let Some(up) = &bonus.level_up {
                let _ = write!(out, "\nYou reached level {}!", up.to);
            }
            out
        }
        Outcome::Leaderboard(entries) => {
            if entries.is_empty() {
                return "No players yet.".to_string();
            }
            let mut out = String::from("Top players:");
            for e in entries {
                let _ = write!(
                    out,
                    "\n  {}. {} - rep {}, level {}, {} gold ({}W/{}L)",
                    e.rank, e.display_name, e.reputation, e.level, e.gold, e.wins, e.losses
                );
            }
            out
        }
        Outcome::DuelProposed(duel) => render_duel(duel),
        Outcome::DuelCancelled(duel) => format!("Duel {} is off.", duel.id),
        Outcome::DuelFought(result) => {
            let mut out = format!(
                "{} vs {}: {} rounds",
                result.report.left_name, result.report.right_name, result.report.rounds
            );
            match (&result.winner, result.report.result) {
                (Some(winner), BattleResult::Winner(side)) => {
                    let dragon = match side {
                        Side::Left => &result.report.left_name,
                        Side::Right => &result.report.right_name,
                    };
                    let _ = write!(
                        out,
                        "\n{} wins for {}! +{} gold, +{} reputation",
                        dragon, winner, result.gold_moved, result.rating_gain
                    );
                }
                _ => out.push_str("\nA draw. Nothing changes hands."),
            }
            out
        }
        Outcome::Duels(duels) => {
            if duels.is_empty() {
                return "No open duels.".to_string();
            }
            duels.iter().map(render_duel).collect::<Vec<_>>().join("\n")
        }
        Outcome::Boss(boss) => render_boss(boss),
        Outcome::BossAttack(attack) => render_boss_attack(attack),
    }
}

/// Message for a failed request. Internal failures are not described to the player.
pub fn render_error(err: &GameError) -> String {
    if err.is_user_facing() {
        let text = err.to_string();
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => text,
        }
    } else {
        "Something went wrong. Please try again later.".to_string()
    }
}
