//! The game engine: loads entities, applies elapsed time, runs one action and
//! persists the result while holding the entity locks.
//!
//! Every public method is one request. Within a request the flow is always
//! lock → load (get-or-create) → accrue → mutate → save, and nothing is saved
//! when the mutation fails.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::game::actions::{self, ActionReport};
use crate::game::boss::{self, BossHit, BossReward, BossSettings};
use crate::game::catalog::Location;
use crate::game::clock::{self, AccrualRates, Clock, SystemClock};
use crate::game::commands::GameCommand;
use crate::game::duel::{self, DuelOutcome, DuelSettings};
use crate::game::economy::{self, DailyBonus, LeaderboardEntry, Purchase, LEADERBOARD_SIZE};
use crate::game::errors::GameError;
use crate::game::flavor::{self, FlavorAction};
use crate::game::locks::EntityLocks;
use crate::game::progression;
use crate::game::storage::{DragonStore, DragonStoreBuilder, WriteSet};
use crate::game::types::{
    duel_key, player_key, BossRecord, DragonOwner, DragonRecord, DuelRecord, PlayerRecord, BOSS_LOCK_KEY,
};
use crate::logutil::escape_log;

/// Which dragon care actions act on.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DragonMode {
    /// One world dragon looked after by everyone.
    #[default]
    Shared,
    /// Each player raises their own dragon.
    Personal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub dragon_mode: DragonMode,
    pub dragon_name: String,
    pub starting_gold: u32,
    pub quest_cooldown_secs: i64,
    pub starvation_hours: i64,
    pub rng_seed: Option<u64>,
    pub accrual: AccrualRates,
    pub duel: DuelSettings,
    pub boss: BossSettings,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GameSettings {
    fn from(config: &Config) -> Self {
        Self {
            dragon_mode: config.game.dragon_mode,
            dragon_name: config.game.dragon_name.clone(),
            starting_gold: config.game.starting_gold,
            quest_cooldown_secs: config.game.quest_cooldown_secs,
            starvation_hours: config.game.starvation_hours,
            rng_seed: config.game.rng_seed,
            accrual: config.accrual.clone(),
            duel: config.duel.clone(),
            boss: config.boss.clone(),
        }
    }
}

/// The player issuing a request, as identified by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BossAttack {
    pub boss: BossRecord,
    pub hit: BossHit,
    /// Filled only by the killing blow.
    pub rewards: Vec<BossReward>,
    pub next_boss: Option<BossRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub dragons_checked: usize,
    /// Dragons no care command can reach in the current mode; left frozen.
    pub skipped: usize,
    pub starved: usize,
    pub failures: usize,
}

/// Everything a command can produce, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Welcome {
        player: PlayerRecord,
        dragon: DragonRecord,
        greeting: &'static str,
    },
    Help,
    Status(DragonRecord),
    Profile(PlayerRecord),
    Inventory(PlayerRecord),
    Shop {
        gold: u32,
    },
    Adventure,
    Action(ActionReport),
    Purchase(Purchase),
    Daily(DailyBonus),
    Leaderboard(Vec<LeaderboardEntry>),
    DuelProposed(DuelRecord),
    DuelCancelled(DuelRecord),
    DuelFought(DuelOutcome),
    Duels(Vec<DuelRecord>),
    Boss(BossRecord),
    BossAttack(BossAttack),
}

pub struct GameEngine {
    store: DragonStore,
    locks: EntityLocks,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    settings: GameSettings,
}

impl GameEngine {
    pub fn new(store: DragonStore, settings: GameSettings, clock: Arc<dyn Clock>) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            locks: EntityLocks::new(),
            clock,
            rng: Mutex::new(rng),
            settings,
        }
    }

    /// Open the configured store and build an engine on the system clock.
    pub fn from_config(config: &Config) -> Result<Self, GameError> {
        let store = DragonStoreBuilder::new(&config.storage.data_dir)
            .world_dragon_name(&config.game.dragon_name)
            .open()?;
        Ok(Self::new(store, GameSettings::from(config), Arc::new(SystemClock)))
    }

    pub fn store(&self) -> &DragonStore {
        &self.store
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// The dragon care and adventure actions apply to.
    pub fn care_owner(&self, actor: &Actor) -> DragonOwner {
        match self.settings.dragon_mode {
            DragonMode::Shared => DragonOwner::World,
            DragonMode::Personal => DragonOwner::player(&actor.id),
        }
    }

    /// Whether care commands can reach `owner`'s dragon in the current mode.
    /// Only tended dragons age: accrual and starvation skip the others.
    pub fn is_tended(&self, owner: &DragonOwner) -> bool {
        matches!(
            (self.settings.dragon_mode, owner),
            (DragonMode::Shared, DragonOwner::World) | (DragonMode::Personal, DragonOwner::Player { .. })
        )
    }

    fn default_dragon_name(&self, owner: &DragonOwner) -> String {
        match owner {
            DragonOwner::World => self.settings.dragon_name.clone(),
            DragonOwner::Player { id } => format!("{}'s dragon", id),
        }
    }

    fn load_player(&self, actor: &Actor, now: DateTime<Utc>) -> Result<PlayerRecord, GameError> {
        self.store
            .get_or_create_player(&actor.id, &actor.display_name, self.settings.starting_gold, now)
    }

    /// Load (or create) a dragon and, if it is tended, bring it up to `now`.
    /// Must be called under its lock.
    fn load_dragon(&self, owner: &DragonOwner, now: DateTime<Utc>) -> Result<DragonRecord, GameError> {
        let name = self.default_dragon_name(owner);
        let mut dragon = self.store.get_or_create_dragon(owner, &name, now)?;
        if !self.is_tended(owner) {
            return Ok(dragon);
        }
        if let Some(summary) = clock::apply_elapsed(&mut dragon, now, &self.settings.accrual) {
            debug!(
                "accrued {} min on {}: hunger {:+} energy {:+} mood {:+} health {:+}",
                summary.minutes,
                owner.key(),
                summary.hunger,
                summary.energy,
                summary.mood,
                summary.health
            );
        }
        Ok(dragon)
    }

    /// Run `action` against the actor's care dragon and player record, saving both on success.
    async fn with_care<T>(
        &self,
        actor: &Actor,
        action: impl FnOnce(&mut DragonRecord, &mut PlayerRecord, DateTime<Utc>, &mut StdRng) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let owner = self.care_owner(actor);
        let _guards = self
            .locks
            .lock_many(&[owner.key(), player_key(&actor.id)])
            .await;
        let now = self.clock.now();
        let mut player = self.load_player(actor, now)?;
        let mut dragon = self.load_dragon(&owner, now)?;
        let result = self.with_rng(|rng| action(&mut dragon, &mut player, now, rng))?;
        player.touch(now);
        self.store.commit(WriteSet::new().dragon(dragon).player(player))?;
        Ok(result)
    }

    /// Run `action` against the actor's player record only.
    async fn with_player<T>(
        &self,
        actor: &Actor,
        action: impl FnOnce(&mut PlayerRecord, DateTime<Utc>, &mut StdRng) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let _guard = self.locks.lock(&player_key(&actor.id)).await;
        let now = self.clock.now();
        let mut player = self.load_player(actor, now)?;
        let result = self.with_rng(|rng| action(&mut player, now, rng))?;
        player.touch(now);
        self.store.put_player(player)?;
        Ok(result)
    }

    fn log_report(&self, actor: &Actor, report: &ActionReport) {
        info!(
            "{} -> {} on {}",
            escape_log(&actor.id),
            report.kind.label(),
            escape_log(&report.dragon_name)
        );
        if let Some(up) = &report.level_up {
            let line = format!("{} reached level {}", report.dragon_name, up.to);
            info!("{}", escape_log(&line));
            if let Err(e) = self.store.append_log(&line) {
                warn!("failed to append event log: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Care and adventure
    // ------------------------------------------------------------------

    /// Create the player and dragon if needed and return both.
    pub async fn start(&self, actor: &Actor) -> Result<(PlayerRecord, DragonRecord), GameError> {
        self.with_care(actor, |dragon, player, _, _| Ok((player.clone(), dragon.clone())))
            .await
    }

    pub async fn status(&self, actor: &Actor) -> Result<DragonRecord, GameError> {
        let owner = self.care_owner(actor);
        let _guard = self.locks.lock(&owner.key()).await;
        let dragon = self.load_dragon(&owner, self.clock.now())?;
        self.store.put_dragon(dragon.clone())?;
        Ok(dragon)
    }

    pub async fn feed(&self, actor: &Actor, item_id: &str) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, player, now, rng| {
                actions::feed(dragon, player, item_id, now, rng)
            })
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn play(&self, actor: &Actor) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, player, now, rng| actions::play(dragon, player, now, rng))
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn rest(&self, actor: &Actor) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, player, now, rng| actions::rest(dragon, player, now, rng))
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn train(&self, actor: &Actor) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, _, now, rng| actions::train(dragon, now, rng))
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn quest(&self, actor: &Actor) -> Result<ActionReport, GameError> {
        let cooldown = self.settings.quest_cooldown_secs;
        let report = self
            .with_care(actor, |dragon, player, now, rng| {
                actions::quest(dragon, player, now, cooldown, rng)
            })
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn explore(&self, actor: &Actor, location: Location) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, player, now, rng| {
                actions::explore(dragon, player, location, now, rng)
            })
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    pub async fn rename(&self, actor: &Actor, name: &str) -> Result<ActionReport, GameError> {
        let report = self
            .with_care(actor, |dragon, _, now, _| actions::rename(dragon, name, now))
            .await?;
        self.log_report(actor, &report);
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    pub async fn profile(&self, actor: &Actor) -> Result<PlayerRecord, GameError> {
        self.with_player(actor, |player, _, _| Ok(player.clone())).await
    }

    pub async fn buy(&self, actor: &Actor, item_id: &str) -> Result<Purchase, GameError> {
        let purchase = self
            .with_player(actor, |player, _, _| economy::buy(player, item_id))
            .await?;
        info!(
            "{} bought {} for {}",
            escape_log(&actor.id),
            purchase.item_id,
            purchase.price
        );
        Ok(purchase)
    }

    /// Claim the daily bonus for the current UTC date.
    pub async fn claim_daily(&self, actor: &Actor) -> Result<DailyBonus, GameError> {
        self.with_player(actor, |player, now, rng| {
            economy::claim_daily(player, now.date_naive(), rng)
        })
        .await
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GameError> {
        Ok(economy::leaderboard(self.store.list_players()?, LEADERBOARD_SIZE))
    }

    // ------------------------------------------------------------------
    // Duels
    // ------------------------------------------------------------------

    pub async fn challenge(&self, actor: &Actor, target_id: &str) -> Result<DuelRecord, GameError> {
        let target_id = target_id.trim().trim_start_matches('@');
        let _guards = self
            .locks
            .lock_many(&[player_key(&actor.id), player_key(target_id)])
            .await;
        let now = self.clock.now();
        let challenger = self.load_player(actor, now)?;
        let target = self.store.get_player(target_id)?;
        let duel = duel::challenge(&challenger.id, &target.id, now)?;
        self.store.put_duel(duel.clone())?;
        info!(
            "duel {} proposed: {} vs {}",
            duel.id,
            escape_log(&duel.challenger),
            escape_log(&duel.target)
        );
        Ok(duel)
    }

    /// Pending duels involving the actor. Stale ones are expired on the way.
    pub async fn pending_duels(&self, actor: &Actor) -> Result<Vec<DuelRecord>, GameError> {
        let now = self.clock.now();
        let timeout = self.settings.duel.timeout_secs;
        let mut open = Vec::new();
        for candidate in self.store.pending_duels_for(&actor.id)? {
            let key = candidate.key();
            let _guard = self.locks.lock(&key).await;
            let mut duel = self.store.get_duel(&candidate.id)?;
            match duel::ensure_open(&mut duel, now, timeout) {
                Ok(()) => open.push(duel),
                Err(_) => self.store.put_duel(duel)?,
            }
        }
        Ok(open)
    }

    pub async fn decline_duel(&self, actor: &Actor, duel_id: &str) -> Result<DuelRecord, GameError> {
        let key = duel_key(duel_id);
        let _guard = self.locks.lock(&key).await;
        let now = self.clock.now();
        let mut duel = self.store.get_duel(duel_id)?;
        let result = duel::cancel(&mut duel, &actor.id, now, self.settings.duel.timeout_secs);
        self.store.put_duel(duel.clone())?;
        result?;
        info!("duel {} cancelled by {}", duel.id, escape_log(&actor.id));
        Ok(duel)
    }

    pub async fn accept_duel(&self, actor: &Actor, duel_id: &str) -> Result<DuelOutcome, GameError> {
        // Participants never change, so they can be read before locking.
        let peek = self.store.get_duel(duel_id)?;
        let challenger_owner = DragonOwner::player(&peek.challenger);
        let target_owner = DragonOwner::player(&peek.target);
        let _guards = self
            .locks
            .lock_many(&[
                peek.key(),
                challenger_owner.key(),
                target_owner.key(),
                player_key(&peek.challenger),
                player_key(&peek.target),
            ])
            .await;

        let now = self.clock.now();
        let mut duel = self.store.get_duel(duel_id)?;
        let mut challenger = self.store.get_or_create_player(
            &duel.challenger,
            &duel.challenger,
            self.settings.starting_gold,
            now,
        )?;
        let mut target = self.store.get_or_create_player(
            &duel.target,
            &duel.target,
            self.settings.starting_gold,
            now,
        )?;
        let challenger_dragon = self.load_dragon(&challenger_owner, now)?;
        let target_dragon = self.load_dragon(&target_owner, now)?;

        let result = self.with_rng(|rng| {
            duel::accept(
                &mut duel,
                &actor.id,
                &mut challenger,
                &challenger_dragon,
                &mut target,
                &target_dragon,
                &self.settings.duel,
                now,
                rng,
            )
        });
        if result.is_err() {
            // A lazily expired duel still needs its new status saved.
            self.store.put_duel(duel)?;
            return result;
        }
        let outcome = result?;
        challenger.touch(now);
        target.touch(now);
        self.store.commit(
            WriteSet::new()
                .duel(duel)
                .player(challenger)
                .player(target),
        )?;

        let line = match (&outcome.winner, &outcome.loser) {
            (Some(w), Some(l)) => format!("duel {}: {} defeated {}", outcome.duel_id, w, l),
            _ => format!("duel {}: draw", outcome.duel_id),
        };
        info!("{}", escape_log(&line));
        if let Err(e) = self.store.append_log(&line) {
            warn!("failed to append event log: {}", e);
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // World boss
    // ------------------------------------------------------------------

    /// Current boss, spawning a new one if needed. Caller must hold the boss lock.
    fn current_boss(&self, now: DateTime<Utc>) -> Result<BossRecord, GameError> {
        let existing = self.store.get_boss()?;
        match boss::respawn_tier(existing.as_ref(), now, &self.settings.boss) {
            None => existing.ok_or_else(|| GameError::Internal("boss vanished".into())),
            Some(tier) => {
                let fresh = boss::spawn(tier, now, &self.settings.boss);
                info!("spawned {} (tier {})", fresh.name, fresh.tier);
                self.store.put_boss(fresh.clone())?;
                Ok(fresh)
            }
        }
    }

    pub async fn boss_status(&self) -> Result<BossRecord, GameError> {
        let _guard = self.locks.lock(BOSS_LOCK_KEY).await;
        self.current_boss(self.clock.now())
    }

    /// Hit the boss with the actor's care dragon. The killing blow pays out every
    /// participant by damage share and spawns the next boss.
    pub async fn attack_boss(&self, actor: &Actor) -> Result<BossAttack, GameError> {
        let _boss_guard = self.locks.lock(BOSS_LOCK_KEY).await;
        let now = self.clock.now();
        let mut current = self.current_boss(now)?;

        let owner = self.care_owner(actor);
        let guards = self
            .locks
            .lock_many(&[owner.key(), player_key(&actor.id)])
            .await;
        let mut player = self.load_player(actor, now)?;
        let mut dragon = self.load_dragon(&owner, now)?;
        let hit = self.with_rng(|rng| {
            boss::strike(&mut current, &player.id, &mut dragon, &self.settings.boss, rng)
        })?;
        dragon.last_interaction = now;
        player.touch(now);
        self.store.commit(
            WriteSet::new()
                .dragon(dragon)
                .player(player)
                .boss(current.clone()),
        )?;
        drop(guards);

        let mut attack = BossAttack {
            boss: current,
            hit,
            rewards: Vec::new(),
            next_boss: None,
        };
        if !attack.hit.killed {
            return Ok(attack);
        }

        let line = format!("{} was slain (tier {})", attack.boss.name, attack.boss.tier);
        info!("{}", line);
        if let Err(e) = self.store.append_log(&line) {
            warn!("failed to append event log: {}", e);
        }
        attack.rewards = boss::rewards(&attack.boss, &self.settings.boss);
        for reward in &attack.rewards {
            let _guard = self.locks.lock(&player_key(&reward.player_id)).await;
            let mut participant = self.store.get_or_create_player(
                &reward.player_id,
                &reward.player_id,
                self.settings.starting_gold,
                now,
            )?;
            participant.gold = participant.gold.saturating_add(reward.gold);
            progression::add_player_experience(&mut participant, reward.exp);
            participant.touch(now);
            self.store.put_player(participant)?;
        }
        attack.next_boss = Some(self.current_boss(now)?);
        Ok(attack)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Bring every stored dragon up to date and apply starvation penalties.
    /// Failures are logged per dragon and do not stop the sweep.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport, GameError> {
        let mut report = MaintenanceReport::default();
        for owner in self.store.list_dragon_owners()? {
            if !self.is_tended(&owner) {
                report.skipped += 1;
                continue;
            }
            let _guard = self.locks.lock(&owner.key()).await;
            let now = self.clock.now();
            let result = self.store.get_dragon(&owner).and_then(|mut dragon| {
                clock::apply_elapsed(&mut dragon, now, &self.settings.accrual);
                let starved = clock::apply_starvation(&mut dragon, now, self.settings.starvation_hours);
                self.store.put_dragon(dragon)?;
                Ok(starved)
            });
            match result {
                Ok(starved) => {
                    report.dragons_checked += 1;
                    if starved {
                        report.starved += 1;
                        warn!("{} is starving", owner.key());
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    warn!("maintenance skipped {}: {}", owner.key(), e);
                }
            }
        }
        debug!(
            "maintenance: {} dragons, {} skipped, {} starving, {} failures",
            report.dragons_checked, report.skipped, report.starved, report.failures
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    pub async fn execute(&self, actor: &Actor, command: GameCommand) -> Result<Outcome, GameError> {
        let outcome = match command {
            GameCommand::Start => {
                let (player, dragon) = self.start(actor).await?;
                let greeting = self.with_rng(|rng| {
                    flavor::response(FlavorAction::Greet, dragon.mood, dragon.hunger, player.affection, rng)
                });
                Outcome::Welcome {
                    player,
                    dragon,
                    greeting,
                }
            }
            GameCommand::Help => Outcome::Help,
            GameCommand::Status => Outcome::Status(self.status(actor).await?),
            GameCommand::Profile => Outcome::Profile(self.profile(actor).await?),
            GameCommand::Inventory => Outcome::Inventory(self.profile(actor).await?),
            GameCommand::Shop => Outcome::Shop {
                gold: self.profile(actor).await?.gold,
            },
            GameCommand::Buy(item) => Outcome::Purchase(self.buy(actor, &item).await?),
            GameCommand::Feed(item) => Outcome::Action(self.feed(actor, &item).await?),
            GameCommand::Play => Outcome::Action(self.play(actor).await?),
            GameCommand::Rest => Outcome::Action(self.rest(actor).await?),
            GameCommand::Train => Outcome::Action(self.train(actor).await?),
            GameCommand::Quest => Outcome::Action(self.quest(actor).await?),
            GameCommand::Adventure => Outcome::Adventure,
            GameCommand::Explore(location) => Outcome::Action(self.explore(actor, location).await?),
            GameCommand::Daily => Outcome::Daily(self.claim_daily(actor).await?),
            GameCommand::Top => Outcome::Leaderboard(self.leaderboard().await?),
            GameCommand::Rename(name) => Outcome::Action(self.rename(actor, &name).await?),
            GameCommand::Duel(target) => Outcome::DuelProposed(self.challenge(actor, &target).await?),
            GameCommand::Duels => Outcome::Duels(self.pending_duels(actor).await?),
            GameCommand::DuelAccept(id) => Outcome::DuelFought(self.accept_duel(actor, &id).await?),
            GameCommand::DuelDecline(id) => Outcome::DuelCancelled(self.decline_duel(actor, &id).await?),
            GameCommand::Boss => Outcome::Boss(self.boss_status().await?),
            GameCommand::BossAttack => Outcome::BossAttack(self.attack_boss(actor).await?),
        };
        Ok(outcome)
    }
}
