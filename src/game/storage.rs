use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use sled::transaction::{TransactionError, TransactionResult};
use sled::{IVec, Transactional};

use crate::game::errors::GameError;
use crate::game::stats;
use crate::game::types::{
    duel_key, player_key, BossRecord, DragonOwner, DragonRecord, DuelRecord, DuelStatus, PlayerRecord,
    BOSS_SCHEMA_VERSION, DRAGON_SCHEMA_VERSION, DUEL_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION,
};
use crate::logutil::escape_log;

const TREE_PLAYERS: &str = "dragonkeep_players";
const TREE_DRAGONS: &str = "dragonkeep_dragons";
const TREE_WORLD: &str = "dragonkeep_world";
const TREE_DUELS: &str = "dragonkeep_duels";
const TREE_LOGS: &str = "dragonkeep_logs";

const BOSS_KEY: &[u8] = b"world:boss";
pub const DEFAULT_DRAGON_NAME: &str = "Ignis";

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct DragonStoreBuilder {
    path: PathBuf,
    world_dragon: Option<String>,
}

impl DragonStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            world_dragon: Some(DEFAULT_DRAGON_NAME.to_string()),
        }
    }

    /// Name given to the world dragon if it has to be created on open.
    pub fn world_dragon_name(mut self, name: &str) -> Self {
        self.world_dragon = Some(name.to_string());
        self
    }

    /// Skip creating the world dragon during initialization.
    pub fn without_world_seed(mut self) -> Self {
        self.world_dragon = None;
        self
    }

    pub fn open(self) -> Result<DragonStore, GameError> {
        let store = DragonStore::open(self.path)?;
        if let Some(name) = self.world_dragon {
            store.get_or_create_dragon(&DragonOwner::World, &name, Utc::now())?;
        }
        Ok(store)
    }
}

/// Records saved together by one request. See [`DragonStore::commit`].
#[derive(Debug, Default)]
pub struct WriteSet {
    players: Vec<PlayerRecord>,
    dragons: Vec<DragonRecord>,
    boss: Option<BossRecord>,
    duels: Vec<DuelRecord>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, player: PlayerRecord) -> Self {
        self.players.push(player);
        self
    }

    pub fn dragon(mut self, dragon: DragonRecord) -> Self {
        self.dragons.push(dragon);
        self
    }

    pub fn boss(mut self, boss: BossRecord) -> Self {
        self.boss = Some(boss);
        self
    }

    pub fn duel(mut self, duel: DuelRecord) -> Self {
        self.duels.push(duel);
        self
    }
}

type Encoded = Vec<(Vec<u8>, Vec<u8>)>;

/// Sled-backed persistence for players, dragons, the world boss and duels.
///
/// Reads of corrupt or outdated records never abort a request: the `get_or_create_*`
/// family logs a warning and replaces the record with a fresh default.
pub struct DragonStore {
    db: sled::Db,
    players: sled::Tree,
    dragons: sled::Tree,
    world: sled::Tree,
    duels: sled::Tree,
    logs: sled::Tree,
}

impl DragonStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Ok(Self {
            players: db.open_tree(TREE_PLAYERS)?,
            dragons: db.open_tree(TREE_DRAGONS)?,
            world: db.open_tree(TREE_WORLD)?,
            duels: db.open_tree(TREE_DUELS)?,
            logs: db.open_tree(TREE_LOGS)?,
            db,
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_schema(entity: &'static str, expected: u8, found: u8) -> Result<(), GameError> {
        if expected != found {
            return Err(GameError::SchemaMismatch {
                entity,
                expected,
                found,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), GameError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        let bytes = Self::serialize(&player)?;
        self.players.insert(player.key().into_bytes(), bytes)?;
        self.players.flush()?;
        Ok(())
    }

    pub fn get_player(&self, id: &str) -> Result<PlayerRecord, GameError> {
        let Some(bytes) = self.players.get(player_key(id).as_bytes())? else {
            return Err(GameError::EntityNotFound(format!("player: {}", id)));
        };
        let record: PlayerRecord = Self::deserialize(bytes)?;
        Self::check_schema("player", PLAYER_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// Fetch the player, inserting a fresh record only if none is stored.
    pub fn get_or_create_player(
        &self,
        id: &str,
        display_name: &str,
        starting_gold: u32,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, GameError> {
        match self.get_player(id) {
            Ok(player) => return Ok(player),
            Err(GameError::EntityNotFound(_)) => {}
            Err(err @ (GameError::Bincode(_) | GameError::SchemaMismatch { .. })) => {
                warn!(
                    "player record for {} unreadable ({}); resetting to defaults",
                    escape_log(id),
                    err
                );
            }
            Err(err) => return Err(err),
        }
        let player = PlayerRecord::new(id, display_name, starting_gold, now);
        self.put_player(player.clone())?;
        Ok(player)
    }

    pub fn list_player_ids(&self) -> Result<Vec<String>, GameError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(b"player:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix("player:") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Every readable player record. Unreadable ones are logged and skipped.
    pub fn list_players(&self) -> Result<Vec<PlayerRecord>, GameError> {
        let mut players = Vec::new();
        for id in self.list_player_ids()? {
            match self.get_player(&id) {
                Ok(player) => players.push(player),
                Err(err) => warn!("skipping player {}: {}", escape_log(&id), err),
            }
        }
        Ok(players)
    }

    // ------------------------------------------------------------------
    // Dragons
    // ------------------------------------------------------------------

    pub fn put_dragon(&self, mut dragon: DragonRecord) -> Result<(), GameError> {
        dragon.schema_version = DRAGON_SCHEMA_VERSION;
        let bytes = Self::serialize(&dragon)?;
        self.dragons.insert(dragon.key().into_bytes(), bytes)?;
        self.dragons.flush()?;
        Ok(())
    }

    pub fn get_dragon(&self, owner: &DragonOwner) -> Result<DragonRecord, GameError> {
        let key = owner.key();
        let Some(bytes) = self.dragons.get(key.as_bytes())? else {
            return Err(GameError::EntityNotFound(key));
        };
        let mut record: DragonRecord = Self::deserialize(bytes)?;
        Self::check_schema("dragon", DRAGON_SCHEMA_VERSION, record.schema_version)?;
        stats::clamp_all(&mut record);
        Ok(record)
    }

    pub fn get_or_create_dragon(
        &self,
        owner: &DragonOwner,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<DragonRecord, GameError> {
        match self.get_dragon(owner) {
            Ok(dragon) => return Ok(dragon),
            Err(GameError::EntityNotFound(_)) => {}
            Err(err @ (GameError::Bincode(_) | GameError::SchemaMismatch { .. })) => {
                warn!("dragon record {} unreadable ({}); resetting to defaults", owner.key(), err);
            }
            Err(err) => return Err(err),
        }
        let dragon = DragonRecord::new(owner.clone(), name, now);
        self.put_dragon(dragon.clone())?;
        Ok(dragon)
    }

    /// Owners of every stored dragon, decoded from the keys alone.
    pub fn list_dragon_owners(&self) -> Result<Vec<DragonOwner>, GameError> {
        let mut owners = Vec::new();
        for entry in self.dragons.iter() {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if text == "dragon:world" {
                owners.push(DragonOwner::World);
            } else if let Some(id) = text.strip_prefix("dragon:player:") {
                owners.push(DragonOwner::player(id));
            }
        }
        Ok(owners)
    }

    // ------------------------------------------------------------------
    // World boss
    // ------------------------------------------------------------------

    /// The current boss, or `None` if none was spawned or the stored one is unreadable.
    pub fn get_boss(&self) -> Result<Option<BossRecord>, GameError> {
        let Some(bytes) = self.world.get(BOSS_KEY)? else {
            return Ok(None);
        };
        match Self::deserialize::<BossRecord>(bytes) {
            Ok(boss) if boss.schema_version == BOSS_SCHEMA_VERSION => Ok(Some(boss)),
            Ok(boss) => {
                warn!(
                    "boss record has schema {} (expected {}); respawning",
                    boss.schema_version, BOSS_SCHEMA_VERSION
                );
                Ok(None)
            }
            Err(err) => {
                warn!("boss record unreadable ({}); respawning", err);
                Ok(None)
            }
        }
    }

    pub fn put_boss(&self, mut boss: BossRecord) -> Result<(), GameError> {
        boss.schema_version = BOSS_SCHEMA_VERSION;
        let bytes = Self::serialize(&boss)?;
        self.world.insert(BOSS_KEY, bytes)?;
        self.world.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Duels
    // ------------------------------------------------------------------

    pub fn put_duel(&self, mut duel: DuelRecord) -> Result<(), GameError> {
        duel.schema_version = DUEL_SCHEMA_VERSION;
        let bytes = Self::serialize(&duel)?;
        self.duels.insert(duel_key(&duel.id).into_bytes(), bytes)?;
        self.duels.flush()?;
        Ok(())
    }

    pub fn get_duel(&self, id: &str) -> Result<DuelRecord, GameError> {
        let Some(bytes) = self.duels.get(duel_key(id).as_bytes())? else {
            return Err(GameError::DuelUnavailable(format!("no duel {}", id)));
        };
        let record: DuelRecord = Self::deserialize(bytes)?;
        Self::check_schema("duel", DUEL_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// Pending duels that involve `player_id`, oldest first. Expiry is not checked here.
    pub fn pending_duels_for(&self, player_id: &str) -> Result<Vec<DuelRecord>, GameError> {
        let mut duels = Vec::new();
        for entry in self.duels.scan_prefix(b"duel:") {
            let (_, bytes) = entry?;
            match Self::deserialize::<DuelRecord>(bytes) {
                Ok(duel) if duel.status == DuelStatus::Pending && duel.involves(player_id) => {
                    duels.push(duel)
                }
                Ok(_) => {}
                Err(err) => warn!("skipping unreadable duel record: {}", err),
            }
        }
        duels.sort_by_key(|d| d.created_at);
        Ok(duels)
    }

    // ------------------------------------------------------------------
    // Multi-record writes
    // ------------------------------------------------------------------

    /// Save every record in `set` in one sled transaction: either all of them
    /// become visible or none do.
    pub fn commit(&self, set: WriteSet) -> Result<(), GameError> {
        let mut players: Encoded = Vec::with_capacity(set.players.len());
        for mut player in set.players {
            player.schema_version = PLAYER_SCHEMA_VERSION;
            players.push((player.key().into_bytes(), Self::serialize(&player)?));
        }
        let mut dragons: Encoded = Vec::with_capacity(set.dragons.len());
        for mut dragon in set.dragons {
            dragon.schema_version = DRAGON_SCHEMA_VERSION;
            dragons.push((dragon.key().into_bytes(), Self::serialize(&dragon)?));
        }
        let boss = match set.boss {
            Some(mut boss) => {
                boss.schema_version = BOSS_SCHEMA_VERSION;
                Some(Self::serialize(&boss)?)
            }
            None => None,
        };
        let mut duels: Encoded = Vec::with_capacity(set.duels.len());
        for mut duel in set.duels {
            duel.schema_version = DUEL_SCHEMA_VERSION;
            duels.push((duel_key(&duel.id).into_bytes(), Self::serialize(&duel)?));
        }

        let result: TransactionResult<()> = (&self.players, &self.dragons, &self.world, &self.duels)
            .transaction(|(tx_players, tx_dragons, tx_world, tx_duels)| {
                for (key, bytes) in &players {
                    tx_players.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, bytes) in &dragons {
                    tx_dragons.insert(key.as_slice(), bytes.as_slice())?;
                }
                if let Some(bytes) = &boss {
                    tx_world.insert(BOSS_KEY, bytes.as_slice())?;
                }
                for (key, bytes) in &duels {
                    tx_duels.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok(())
            });
        result.map_err(|err| match err {
            TransactionError::Abort(()) => GameError::Internal("write transaction aborted".into()),
            TransactionError::Storage(e) => GameError::Sled(e),
        })?;
        self.db.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event log
    // ------------------------------------------------------------------

    /// Append a line to the game event log tree.
    pub fn append_log(&self, message: &str) -> Result<(), GameError> {
        let seq = self.db.generate_id()?;
        let key = format!("logs:{:020}:{:020}", next_timestamp_nanos(), seq).into_bytes();
        self.logs.insert(key, message.as_bytes())?;
        self.logs.flush()?;
        Ok(())
    }

    /// Most recent log lines, newest last.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<String>, GameError> {
        let mut lines = Vec::new();
        for entry in self.logs.scan_prefix(b"logs:").rev().take(limit) {
            let (_, value) = entry?;
            lines.push(String::from_utf8_lossy(&value).into_owned());
        }
        lines.reverse();
        Ok(lines)
    }

    /// Raw write used by tests to plant corrupt records.
    #[cfg(test)]
    pub(crate) fn put_raw_player(&self, id: &str, bytes: &[u8]) -> Result<(), GameError> {
        self.players.insert(player_key(id).into_bytes(), bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::boss::BossSettings;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        let mut player = PlayerRecord::new("alice", "Alice", 100, Utc::now());
        player.gold = 42;
        player.add_item("bread", 3);
        store.put_player(player.clone()).expect("put");
        let fetched = store.get_player("ALICE").expect("get");
        assert_eq!(fetched, player);
    }

    #[test]
    fn get_or_create_inserts_once() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        let now = Utc::now();
        let mut first = store.get_or_create_player("bob", "Bob", 100, now).expect("create");
        first.gold = 7;
        store.put_player(first).expect("put");
        let second = store.get_or_create_player("bob", "Bobby", 100, now).expect("get");
        assert_eq!(second.gold, 7);
        assert_eq!(second.display_name, "Bob");
        assert_eq!(store.list_player_ids().expect("ids"), vec!["bob".to_string()]);
    }

    #[test]
    fn corrupt_player_falls_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        store.put_raw_player("carol", &[0xff, 0x01]).expect("raw");
        assert!(store.get_player("carol").is_err());
        let player = store
            .get_or_create_player("carol", "Carol", 100, Utc::now())
            .expect("fallback");
        assert_eq!(player.gold, 100);
        assert!(player.inventory.is_empty());
        assert!(store.get_player("carol").is_ok());
    }

    #[test]
    fn world_dragon_is_seeded_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = DragonStoreBuilder::new(dir.path())
                .world_dragon_name("Smaug")
                .open()
                .expect("store");
            let mut dragon = store.get_dragon(&DragonOwner::World).expect("world dragon");
            dragon.hunger = 12;
            store.put_dragon(dragon).expect("put");
        }
        let store = DragonStoreBuilder::new(dir.path()).open().expect("reopen");
        let dragon = store.get_dragon(&DragonOwner::World).expect("world dragon");
        assert_eq!(dragon.name, "Smaug");
        assert_eq!(dragon.hunger, 12);
        assert_eq!(store.list_dragon_owners().expect("owners"), vec![DragonOwner::World]);
    }

    #[test]
    fn pending_duels_are_filtered() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("store");
        let now = Utc::now();
        let open = DuelRecord::new("a", "b", now);
        let mut closed = DuelRecord::new("a", "b", now);
        closed.status = DuelStatus::Cancelled;
        store.put_duel(open.clone()).expect("put");
        store.put_duel(closed).expect("put");
        let pending = store.pending_duels_for("B").expect("pending");
        assert_eq!(pending, vec![open]);
        assert!(store.pending_duels_for("c").expect("pending").is_empty());
    }

    #[test]
    fn boss_missing_or_corrupt_reads_as_none() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("store");
        assert!(store.get_boss().expect("boss").is_none());
        store.world.insert(BOSS_KEY, &[1u8, 2, 3][..]).expect("raw");
        assert!(store.get_boss().expect("boss").is_none());
    }

    #[test]
    fn logs_keep_order() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        store.append_log("first").expect("log");
        store.append_log("second").expect("log");
        assert_eq!(store.recent_logs(1).expect("logs"), vec!["second".to_string()]);
        assert_eq!(store.recent_logs(10).expect("logs").len(), 2);
    }

    #[test]
    fn commit_saves_every_record_of_a_request() {
        let dir = TempDir::new().expect("tempdir");
        let now = Utc::now();
        let duel = DuelRecord::new("dan", "eve", now);
        let duel_id = duel.id.clone();
        {
            let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
            let mut player = store.get_or_create_player("dan", "Dan", 100, now).expect("player");
            let mut dragon = store.get_dragon(&DragonOwner::World).expect("dragon");
            player.add_item("bread", 1);
            player.schema_version = 0;
            dragon.hunger = 77;
            let mut boss = crate::game::boss::spawn(1, now, &BossSettings::default());
            boss.hp = 5;
            store
                .commit(
                    WriteSet::new()
                        .player(player)
                        .dragon(dragon)
                        .boss(boss)
                        .duel(duel),
                )
                .expect("commit");
        }
        let store = DragonStoreBuilder::new(dir.path()).open().expect("reopen");
        let player = store.get_player("dan").expect("player");
        assert_eq!(player.item_count("bread"), 1);
        assert_eq!(player.schema_version, PLAYER_SCHEMA_VERSION);
        assert_eq!(store.get_dragon(&DragonOwner::World).expect("dragon").hunger, 77);
        assert_eq!(store.get_boss().expect("boss").map(|b| b.hp), Some(5));
        assert_eq!(store.get_duel(&duel_id).expect("duel").status, DuelStatus::Pending);
    }

    #[test]
    fn empty_commit_is_harmless() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        store.commit(WriteSet::new()).expect("commit");
        assert!(store.list_player_ids().expect("ids").is_empty());
    }
}
