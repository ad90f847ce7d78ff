use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const DRAGON_SCHEMA_VERSION: u8 = 1;
pub const BOSS_SCHEMA_VERSION: u8 = 1;
pub const DUEL_SCHEMA_VERSION: u8 = 1;

/// Upper bound for hunger, energy and mood.
pub const STAT_CAP: u32 = 100;
/// Upper bound for the four combat attributes.
pub const ATTRIBUTE_CAP: u32 = 999;

pub const STARTING_HEALTH: u32 = 100;
pub const STARTING_HUNGER: u32 = 50;
pub const STARTING_ENERGY: u32 = 100;
pub const STARTING_MOOD: u32 = 70;
pub const STARTING_ATTRIBUTE: u32 = 10;

// ============================================================================
// Dragon
// ============================================================================

/// Evolution path label, overwritten by whichever mutation triggered last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionPath {
    Neutral,
    Fire,
    Wisdom,
    Shadow,
}

impl EvolutionPath {
    pub fn label(&self) -> &'static str {
        match self {
            EvolutionPath::Neutral => "Neutral",
            EvolutionPath::Fire => "Fire",
            EvolutionPath::Wisdom => "Wisdom",
            EvolutionPath::Shadow => "Shadow",
        }
    }

    /// Ability granted when a mutation sets this path.
    pub fn ability(&self) -> Option<Ability> {
        match self {
            EvolutionPath::Neutral => None,
            EvolutionPath::Fire => Some(Ability::FireBreath),
            EvolutionPath::Wisdom => Some(Ability::Telepathy),
            EvolutionPath::Shadow => Some(Ability::Invisibility),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    /// Starting ability, purely cosmetic.
    Spark,
    /// +5 elemental damage on every landed hit.
    FireBreath,
    /// +5% critical chance.
    Telepathy,
    /// +10% dodge chance.
    Invisibility,
    /// x1.5 damage while below 30% health.
    Fury,
    /// Extra passive healing over time.
    Regeneration,
}

impl Ability {
    pub fn display_name(&self) -> &'static str {
        match self {
            Ability::Spark => "Spark",
            Ability::FireBreath => "Fire Breath",
            Ability::Telepathy => "Telepathy",
            Ability::Invisibility => "Invisibility",
            Ability::Fury => "Fury",
            Ability::Regeneration => "Regeneration",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Strength,
    Endurance,
    Intelligence,
    Charisma,
}

impl Attribute {
    pub fn label(&self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Endurance => "Endurance",
            Attribute::Intelligence => "Intelligence",
            Attribute::Charisma => "Charisma",
        }
    }
}

/// Who a dragon belongs to. The world dragon is the community singleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DragonOwner {
    World,
    Player { id: String },
}

impl DragonOwner {
    pub fn player(id: &str) -> Self {
        DragonOwner::Player { id: id.to_string() }
    }

    /// Stable storage and lock key for this dragon.
    pub fn key(&self) -> String {
        match self {
            DragonOwner::World => "dragon:world".to_string(),
            DragonOwner::Player { id } => format!("dragon:player:{}", id.to_ascii_lowercase()),
        }
    }
}

/// Fractional stat progress left over from previous accruals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AccrualCarry {
    pub hunger: f64,
    pub energy: f64,
    pub mood: f64,
    pub health: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DragonRecord {
    pub owner: DragonOwner,
    pub name: String,
    pub path: EvolutionPath,
    pub level: u32,
    /// Progress towards the next level; always below the level threshold at rest.
    pub exp: u32,
    pub health: u32,
    pub max_health: u32,
    pub hunger: u32,
    pub energy: u32,
    pub mood: u32,
    pub strength: u32,
    pub endurance: u32,
    pub intelligence: u32,
    pub charisma: u32,
    pub abilities: BTreeSet<Ability>,
    /// Every mutation that has ever triggered on this dragon.
    pub mutations: BTreeSet<EvolutionPath>,
    pub last_fed: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub last_tick: DateTime<Utc>,
    pub carry: AccrualCarry,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl DragonRecord {
    pub fn new(owner: DragonOwner, name: &str, now: DateTime<Utc>) -> Self {
        let mut abilities = BTreeSet::new();
        abilities.insert(Ability::Spark);
        Self {
            owner,
            name: name.to_string(),
            path: EvolutionPath::Neutral,
            level: 1,
            exp: 0,
            health: STARTING_HEALTH,
            max_health: STARTING_HEALTH,
            hunger: STARTING_HUNGER,
            energy: STARTING_ENERGY,
            mood: STARTING_MOOD,
            strength: STARTING_ATTRIBUTE,
            endurance: STARTING_ATTRIBUTE,
            intelligence: STARTING_ATTRIBUTE,
            charisma: STARTING_ATTRIBUTE,
            abilities,
            mutations: BTreeSet::new(),
            last_fed: now,
            last_interaction: now,
            last_tick: now,
            carry: AccrualCarry::default(),
            created_at: now,
            schema_version: DRAGON_SCHEMA_VERSION,
        }
    }

    pub fn key(&self) -> String {
        self.owner.key()
    }

    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    pub fn attribute(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Endurance => self.endurance,
            Attribute::Intelligence => self.intelligence,
            Attribute::Charisma => self.charisma,
        }
    }

    pub(crate) fn attribute_mut(&mut self, attribute: Attribute) -> &mut u32 {
        match attribute {
            Attribute::Strength => &mut self.strength,
            Attribute::Endurance => &mut self.endurance,
            Attribute::Intelligence => &mut self.intelligence,
            Attribute::Charisma => &mut self.charisma,
        }
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub id: String,
    pub display_name: String,
    pub gold: u32,
    /// Player progression track, independent from any dragon.
    pub level: u32,
    pub exp: u32,
    /// Duel rating.
    pub reputation: i32,
    /// Cumulative standing with the dragon; gates flavor text and rest healing.
    pub affection: i32,
    /// item id -> count. Entries are removed when they reach zero.
    pub inventory: BTreeMap<String, u32>,
    pub pvp_wins: u32,
    pub pvp_losses: u32,
    pub last_daily: Option<NaiveDate>,
    pub last_quest_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(id: &str, display_name: &str, starting_gold: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            gold: starting_gold,
            level: 1,
            exp: 0,
            reputation: 0,
            affection: 0,
            inventory: BTreeMap::new(),
            pvp_wins: 0,
            pvp_losses: 0,
            last_daily: None,
            last_quest_at: None,
            created_at: now,
            updated_at: now,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn key(&self) -> String {
        player_key(&self.id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn item_count(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item_id: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.inventory.entry(item_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Remove one unit of `item_id`. Returns false (and changes nothing) when none is held.
    pub fn take_item(&mut self, item_id: &str) -> bool {
        match self.inventory.get_mut(item_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(item_id);
                }
                true
            }
            Some(_) => {
                self.inventory.remove(item_id);
                false
            }
            None => false,
        }
    }
}

pub fn player_key(id: &str) -> String {
    format!("player:{}", id.to_ascii_lowercase())
}

/// Storage and lock key for a duel. Ids are matched case-insensitively.
pub fn duel_key(id: &str) -> String {
    format!("duel:{}", id.trim().to_ascii_lowercase())
}

// ============================================================================
// World boss
// ============================================================================

pub const BOSS_LOCK_KEY: &str = "boss";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossRecord {
    pub id: String,
    pub name: String,
    pub tier: u32,
    pub max_hp: u64,
    pub hp: u64,
    pub armor: u32,
    pub spawned_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// player id -> cumulative damage dealt to this boss.
    pub damage_ledger: BTreeMap<String, u64>,
    pub schema_version: u8,
}

impl BossRecord {
    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn total_damage(&self) -> u64 {
        self.damage_ledger.values().sum()
    }
}

// ============================================================================
// Duels
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Pending,
    Accepted,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuelRecord {
    pub id: String,
    pub challenger: String,
    pub target: String,
    pub status: DuelStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl DuelRecord {
    pub fn new(challenger: &str, target: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
            challenger: challenger.to_string(),
            target: target.to_string(),
            status: DuelStatus::Pending,
            created_at: now,
            resolved_at: None,
            schema_version: DUEL_SCHEMA_VERSION,
        }
    }

    pub fn key(&self) -> String {
        duel_key(&self.id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout_secs: i64) -> bool {
        now.signed_duration_since(self.created_at).num_seconds() > timeout_secs
    }

    pub fn involves(&self, player_id: &str) -> bool {
        self.challenger.eq_ignore_ascii_case(player_id) || self.target.eq_ignore_ascii_case(player_id)
    }
}
