//! Wall-clock access and elapsed-time accrual for dragons.
//!
//! Every engine entry point asks an injected [`Clock`] for "now" so tests can drive
//! time explicitly. [`apply_elapsed`] converts the minutes since a dragon's last tick
//! into linear stat changes; [`apply_starvation`] is the separate long-neglect penalty
//! run by the maintenance sweep.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::game::types::{Ability, DragonRecord, STAT_CAP};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Per-minute accrual rates. Conditions are checked against the state at the start
/// of an accrual, so a single long gap is applied linearly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccrualRates {
    pub hunger_decay: f64,
    /// Drain while the dragon is lively (mood above `active_mood`).
    pub energy_fatigue: f64,
    pub active_mood: u32,
    /// Recovery while energy is below `rest_below` and hunger above `fed_above`.
    pub energy_regen: f64,
    pub rest_below: u32,
    pub fed_above: u32,
    pub mood_starving_penalty: f64,
    pub starving_below: u32,
    pub mood_full_bonus: f64,
    pub full_above: u32,
    pub mood_tired_penalty: f64,
    pub tired_below: u32,
    /// Healing while hunger is above zero.
    pub health_regen: f64,
    /// Additional healing granted by the Regeneration ability.
    pub regeneration_bonus: f64,
}

impl Default for AccrualRates {
    fn default() -> Self {
        Self {
            hunger_decay: 0.4,
            energy_fatigue: 0.2,
            active_mood: 50,
            energy_regen: 1.0,
            rest_below: 50,
            fed_above: 30,
            mood_starving_penalty: 0.6,
            starving_below: 20,
            mood_full_bonus: 0.2,
            full_above: 80,
            mood_tired_penalty: 0.4,
            tired_below: 20,
            health_regen: 0.1,
            regeneration_bonus: 0.4,
        }
    }
}

/// Net whole-point changes produced by one accrual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccrualSummary {
    pub minutes: i64,
    pub hunger: i64,
    pub energy: i64,
    pub mood: i64,
    pub health: i64,
}

/// Split `carry + rate * minutes` into whole points and the fractional remainder.
fn accrue(carry: &mut f64, rate_per_minute: f64, minutes: f64) -> i64 {
    let total = *carry + rate_per_minute * minutes;
    // Snap values within float noise of an integer so repeated small steps add up.
    let rounded = total.round();
    let whole = if (total - rounded).abs() < 1e-9 {
        rounded
    } else {
        total.trunc()
    };
    *carry = total - whole;
    whole as i64
}

fn shift(value: u32, delta: i64, cap: u32) -> u32 {
    (value as i64 + delta).clamp(0, cap as i64) as u32
}

/// Apply the time elapsed since `dragon.last_tick`.
///
/// Zero elapsed time is a no-op. A clock that moved backwards is treated as zero
/// elapsed time and leaves `last_tick` untouched.
pub fn apply_elapsed(
    dragon: &mut DragonRecord,
    now: DateTime<Utc>,
    rates: &AccrualRates,
) -> Option<AccrualSummary> {
    let elapsed = now.signed_duration_since(dragon.last_tick);
    if elapsed <= Duration::zero() {
        return None;
    }
    let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;

    let mut hunger_rate = -rates.hunger_decay;
    let mut energy_rate = 0.0;
    if dragon.mood > rates.active_mood {
        energy_rate -= rates.energy_fatigue;
    }
    if dragon.energy < rates.rest_below && dragon.hunger > rates.fed_above {
        energy_rate += rates.energy_regen;
    }
    let mut mood_rate = 0.0;
    if dragon.hunger < rates.starving_below {
        mood_rate -= rates.mood_starving_penalty;
    } else if dragon.hunger > rates.full_above {
        mood_rate += rates.mood_full_bonus;
    }
    if dragon.energy < rates.tired_below {
        mood_rate -= rates.mood_tired_penalty;
    }
    let mut health_rate = 0.0;
    if dragon.hunger > 0 {
        health_rate += rates.health_regen;
    }
    if dragon.has_ability(Ability::Regeneration) {
        health_rate += rates.regeneration_bonus;
    }
    // Nothing left to eat means no further decay to carry.
    if dragon.hunger == 0 {
        hunger_rate = 0.0;
        dragon.carry.hunger = 0.0;
    }

    let summary = AccrualSummary {
        minutes: elapsed.num_minutes(),
        hunger: accrue(&mut dragon.carry.hunger, hunger_rate, minutes),
        energy: accrue(&mut dragon.carry.energy, energy_rate, minutes),
        mood: accrue(&mut dragon.carry.mood, mood_rate, minutes),
        health: accrue(&mut dragon.carry.health, health_rate, minutes),
    };

    dragon.hunger = shift(dragon.hunger, summary.hunger, STAT_CAP);
    dragon.energy = shift(dragon.energy, summary.energy, STAT_CAP);
    dragon.mood = shift(dragon.mood, summary.mood, STAT_CAP);
    dragon.health = shift(dragon.health, summary.health, dragon.max_health);
    dragon.last_tick = now;
    Some(summary)
}

pub const STARVATION_HEALTH_PENALTY: u32 = 10;
pub const STARVATION_MOOD_PENALTY: u32 = 10;

/// Penalise a dragon that has not been fed for longer than `threshold_hours`.
/// Health never drops below 1 through this path. Returns whether the penalty applied.
pub fn apply_starvation(dragon: &mut DragonRecord, now: DateTime<Utc>, threshold_hours: i64) -> bool {
    let hours = now.signed_duration_since(dragon.last_fed).num_hours();
    if hours <= threshold_hours {
        return false;
    }
    dragon.health = dragon.health.saturating_sub(STARVATION_HEALTH_PENALTY).max(1);
    dragon.mood = dragon.mood.saturating_sub(STARVATION_MOOD_PENALTY);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::DragonOwner;

    fn dragon_at(now: DateTime<Utc>) -> DragonRecord {
        DragonRecord::new(DragonOwner::World, "Ember", now)
    }

    #[test]
    fn zero_elapsed_is_noop() {
        let now = Utc::now();
        let mut dragon = dragon_at(now);
        let before = dragon.clone();
        assert!(apply_elapsed(&mut dragon, now, &AccrualRates::default()).is_none());
        assert_eq!(dragon, before);
    }

    #[test]
    fn negative_elapsed_is_ignored() {
        let now = Utc::now();
        let mut dragon = dragon_at(now);
        let before = dragon.clone();
        let earlier = now - Duration::minutes(30);
        assert!(apply_elapsed(&mut dragon, earlier, &AccrualRates::default()).is_none());
        assert_eq!(dragon, before);
    }

    #[test]
    fn hunger_decays_linearly() {
        let now = Utc::now();
        let mut dragon = dragon_at(now);
        apply_elapsed(&mut dragon, now + Duration::minutes(50), &AccrualRates::default());
        assert_eq!(dragon.hunger, 30);
        assert_eq!(dragon.last_tick, now + Duration::minutes(50));
    }

    #[test]
    fn frequent_ticks_do_not_lose_decay() {
        let start = Utc::now();
        let mut dragon = dragon_at(start);
        let rates = AccrualRates::default();
        for minute in 1..=10 {
            apply_elapsed(&mut dragon, start + Duration::minutes(minute), &rates);
        }
        assert_eq!(dragon.hunger, 46);
    }

    #[test]
    fn long_gaps_stay_in_bounds() {
        let now = Utc::now();
        let mut dragon = dragon_at(now);
        dragon.energy = 10;
        apply_elapsed(&mut dragon, now + Duration::days(40), &AccrualRates::default());
        assert_eq!(dragon.hunger, 0);
        assert!(dragon.energy <= STAT_CAP);
        assert!(dragon.mood <= STAT_CAP);
        assert!(dragon.health <= dragon.max_health);
    }

    #[test]
    fn regeneration_ability_speeds_healing() {
        let now = Utc::now();
        let mut plain = dragon_at(now);
        plain.health = 50;
        let mut regen = plain.clone();
        regen.abilities.insert(Ability::Regeneration);
        let later = now + Duration::minutes(20);
        apply_elapsed(&mut plain, later, &AccrualRates::default());
        apply_elapsed(&mut regen, later, &AccrualRates::default());
        assert_eq!(plain.health, 52);
        assert_eq!(regen.health, 60);
    }

    #[test]
    fn starvation_never_kills() {
        let now = Utc::now();
        let mut dragon = dragon_at(now - Duration::hours(400));
        dragon.health = 5;
        assert!(apply_starvation(&mut dragon, now, 360));
        assert_eq!(dragon.health, 1);
        assert!(apply_starvation(&mut dragon, now, 360));
        assert_eq!(dragon.health, 1);
        assert_eq!(dragon.mood, 50);
    }

    #[test]
    fn starvation_waits_for_threshold() {
        let now = Utc::now();
        let mut dragon = dragon_at(now - Duration::hours(360));
        assert!(!apply_starvation(&mut dragon, now, 360));
        assert_eq!(dragon.health, 100);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));
    }
}
