//! Player-versus-player duels.
//!
//! A duel is proposed, then accepted, declined or left to expire. Expiry is checked
//! lazily whenever the record is touched. Resolution is a sparring match: the
//! persisted dragons are never damaged, only gold, reputation and the win/loss
//! counters move.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::combat::{self, BattleReport, BattleResult, Combatant, Side};
use crate::game::errors::GameError;
use crate::game::types::{DragonRecord, DuelRecord, DuelStatus, PlayerRecord};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuelSettings {
    pub timeout_secs: i64,
    pub gold_reward: u32,
    pub rating_gain: i32,
    pub rating_loss: i32,
    pub max_rounds: u32,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            gold_reward: 20,
            rating_gain: 10,
            rating_loss: 8,
            max_rounds: combat::MAX_ROUNDS,
        }
    }
}

pub fn challenge(challenger: &str, target: &str, now: DateTime<Utc>) -> Result<DuelRecord, GameError> {
    if challenger.eq_ignore_ascii_case(target) {
        return Err(GameError::DuelUnavailable(
            "you cannot challenge yourself".to_string(),
        ));
    }
    Ok(DuelRecord::new(challenger, target, now))
}

/// Check that `duel` can still be answered. A stale pending duel is flipped to
/// `Expired` here; the caller should persist it before reporting the error.
pub fn ensure_open(duel: &mut DuelRecord, now: DateTime<Utc>, timeout_secs: i64) -> Result<(), GameError> {
    match duel.status {
        DuelStatus::Pending => {}
        DuelStatus::Accepted => {
            return Err(GameError::DuelUnavailable(format!("duel {} already fought", duel.id)))
        }
        DuelStatus::Cancelled => {
            return Err(GameError::DuelUnavailable(format!("duel {} was cancelled", duel.id)))
        }
        DuelStatus::Expired => {
            return Err(GameError::DuelUnavailable(format!("duel {} has expired", duel.id)))
        }
    }
    if duel.is_expired(now, timeout_secs) {
        duel.status = DuelStatus::Expired;
        duel.resolved_at = Some(now);
        return Err(GameError::DuelUnavailable(format!("duel {} has expired", duel.id)));
    }
    Ok(())
}

/// Decline (target) or withdraw (challenger) a pending duel.
pub fn cancel(duel: &mut DuelRecord, actor: &str, now: DateTime<Utc>, timeout_secs: i64) -> Result<(), GameError> {
    if !duel.involves(actor) {
        return Err(GameError::DuelUnavailable(format!("duel {} is not yours", duel.id)));
    }
    ensure_open(duel, now, timeout_secs)?;
    duel.status = DuelStatus::Cancelled;
    duel.resolved_at = Some(now);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuelOutcome {
    pub duel_id: String,
    pub report: BattleReport,
    /// Player id of the winner; `None` for a draw.
    pub winner: Option<String>,
    pub loser: Option<String>,
    pub gold_moved: u32,
    pub rating_gain: i32,
    pub rating_loss: i32,
}

/// Accept and fight a pending duel. Only the challenged player may accept.
#[allow(clippy::too_many_arguments)]
pub fn accept<R: Rng + ?Sized>(
    duel: &mut DuelRecord,
    actor: &str,
    challenger: &mut PlayerRecord,
    challenger_dragon: &DragonRecord,
    target: &mut PlayerRecord,
    target_dragon: &DragonRecord,
    settings: &DuelSettings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<DuelOutcome, GameError> {
    if !duel.target.eq_ignore_ascii_case(actor) {
        return Err(GameError::DuelUnavailable(format!(
            "only {} can accept duel {}",
            duel.target, duel.id
        )));
    }
    ensure_open(duel, now, settings.timeout_secs)?;

    let opener = if rng.gen_bool(0.5) { Side::Left } else { Side::Right };
    let report = combat::simulate_from(
        Combatant::from_dragon(challenger_dragon),
        Combatant::from_dragon(target_dragon),
        opener,
        rng,
        settings.max_rounds,
    );
    duel.status = DuelStatus::Accepted;
    duel.resolved_at = Some(now);

    let mut outcome = DuelOutcome {
        duel_id: duel.id.clone(),
        winner: None,
        loser: None,
        gold_moved: 0,
        rating_gain: 0,
        rating_loss: 0,
        report,
    };
    let (winner, loser) = match outcome.report.result {
        BattleResult::Draw => return Ok(outcome),
        BattleResult::Winner(Side::Left) => (challenger, target),
        BattleResult::Winner(Side::Right) => (target, challenger),
    };

    let gold = settings.gold_reward.min(loser.gold);
    loser.gold -= gold;
    winner.gold = winner.gold.saturating_add(gold);
    winner.reputation = winner.reputation.saturating_add(settings.rating_gain);
    loser.reputation = loser.reputation.saturating_sub(settings.rating_loss);
    winner.pvp_wins += 1;
    loser.pvp_losses += 1;

    outcome.winner = Some(winner.id.clone());
    outcome.loser = Some(loser.id.clone());
    outcome.gold_moved = gold;
    outcome.rating_gain = settings.rating_gain;
    outcome.rating_loss = settings.rating_loss;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::DragonOwner;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn self_challenge_is_refused() {
        assert!(challenge("Ann", "ann", Utc::now()).is_err());
    }

    #[test]
    fn stale_duel_expires_on_touch() {
        let now = Utc::now();
        let mut duel = challenge("a", "b", now).unwrap();
        let later = now + Duration::seconds(301);
        assert!(ensure_open(&mut duel, later, 300).is_err());
        assert_eq!(duel.status, DuelStatus::Expired);
        // Expired duels stay closed.
        assert!(cancel(&mut duel, "b", later, 300).is_err());
    }

    #[test]
    fn decline_closes_duel() {
        let now = Utc::now();
        let mut duel = challenge("a", "b", now).unwrap();
        assert!(cancel(&mut duel, "c", now, 300).is_err());
        cancel(&mut duel, "b", now, 300).unwrap();
        assert_eq!(duel.status, DuelStatus::Cancelled);
    }

    #[test]
    fn winner_takes_gold_and_rating() {
        let now = Utc::now();
        let mut duel = challenge("a", "b", now).unwrap();
        let mut a = PlayerRecord::new("a", "A", 100, now);
        let mut b = PlayerRecord::new("b", "B", 5, now);
        let mut strong = DragonRecord::new(DragonOwner::player("a"), "Strong", now);
        strong.strength = 200;
        let mut weak = DragonRecord::new(DragonOwner::player("b"), "Weak", now);
        weak.intelligence = 0;
        let mut rng = StdRng::seed_from_u64(6);

        let err = accept(&mut duel, "a", &mut a, &strong, &mut b, &weak, &DuelSettings::default(), now, &mut rng);
        assert!(err.is_err());

        let outcome = accept(&mut duel, "b", &mut a, &strong, &mut b, &weak, &DuelSettings::default(), now, &mut rng)
            .unwrap();
        assert_eq!(outcome.winner.as_deref(), Some("a"));
        assert_eq!(outcome.gold_moved, 5);
        assert_eq!(a.gold, 105);
        assert_eq!(b.gold, 0);
        assert_eq!((a.reputation, b.reputation), (10, -8));
        assert_eq!((a.pvp_wins, b.pvp_losses), (1, 1));
        assert_eq!(duel.status, DuelStatus::Accepted);
    }

    #[test]
    fn either_side_may_open() {
        let now = Utc::now();
        let challenger_dragon = DragonRecord::new(DragonOwner::player("a"), "Left", now);
        let target_dragon = DragonRecord::new(DragonOwner::player("b"), "Right", now);
        let mut openers = std::collections::BTreeSet::new();
        for seed in 0..32 {
            let mut duel = challenge("a", "b", now).unwrap();
            let mut a = PlayerRecord::new("a", "A", 100, now);
            let mut b = PlayerRecord::new("b", "B", 100, now);
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = accept(
                &mut duel,
                "b",
                &mut a,
                &challenger_dragon,
                &mut b,
                &target_dragon,
                &DuelSettings::default(),
                now,
                &mut rng,
            )
            .unwrap();
            openers.insert(format!("{:?}", outcome.report.hits[0].attacker));
        }
        assert_eq!(openers.len(), 2);
    }
}
