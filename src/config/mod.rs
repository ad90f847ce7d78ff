//! # Configuration Management Module
//!
//! Loads and writes the TOML configuration for the dragonkeep game server.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - Dragon mode, world dragon name, starting gold, quest cooldown, RNG seed
//! - [`StorageConfig`] - Sled data directory
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`MaintenanceConfig`] - Background accrual/starvation sweep
//! - [`AccrualRates`] - Per-minute stat drift
//! - [`DuelSettings`] / [`BossSettings`] - PvP and world boss tuning
//!
//! Every section is optional in the file; missing sections and keys fall back to
//! their defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dragonkeep::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("World dragon: {}", config.game.dragon_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! dragon_mode = "shared"
//! dragon_name = "Ignis"
//! starting_gold = 100
//!
//! [storage]
//! data_dir = "./data"
//!
//! [maintenance]
//! enabled = true
//! interval_secs = 300
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::game::boss::BossSettings;
use crate::game::clock::AccrualRates;
use crate::game::duel::DuelSettings;
use crate::game::engine::DragonMode;
pub use crate::game::maintenance::MaintenanceConfig;
use crate::game::storage::DEFAULT_DRAGON_NAME;
use crate::validation::validate_dragon_name;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub dragon_mode: DragonMode,
    /// Name given to the world dragon when it is first seeded.
    pub dragon_name: String,
    pub starting_gold: u32,
    pub quest_cooldown_secs: i64,
    /// Hours without food before the maintenance sweep applies starvation.
    pub starvation_hours: i64,
    /// Fixed seed for reproducible runs. Unset means a fresh entropy seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dragon_mode: DragonMode::Shared,
            dragon_name: DEFAULT_DRAGON_NAME.to_string(),
            starting_gold: 100,
            quest_cooldown_secs: 600,
            starvation_hours: 360,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/dragonkeep".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("dragonkeep.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Parsed level, falling back to `Info` for unknown strings.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub maintenance: MaintenanceConfig,
    pub accrual: AccrualRates,
    pub duel: DuelSettings,
    pub boss: BossSettings,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_dragon_name(&self.game.dragon_name)
            .map_err(|e| anyhow!("game.dragon_name: {}", e))?;
        if self.game.quest_cooldown_secs < 0 {
            return Err(anyhow!("game.quest_cooldown_secs must not be negative"));
        }
        if self.game.starvation_hours < 0 {
            return Err(anyhow!("game.starvation_hours must not be negative"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.maintenance.interval_secs == 0 {
            return Err(anyhow!("maintenance.interval_secs must be at least 1"));
        }
        if self.duel.timeout_secs <= 0 {
            return Err(anyhow!("duel.timeout_secs must be positive"));
        }
        if self.duel.max_rounds == 0 {
            return Err(anyhow!("duel.max_rounds must be at least 1"));
        }
        if self.boss.max_tier == 0 || self.boss.hp_per_tier == 0 {
            return Err(anyhow!("boss.max_tier and boss.hp_per_tier must be at least 1"));
        }
        if self.boss.lifetime_hours <= 0 {
            return Err(anyhow!("boss.lifetime_hours must be positive"));
        }
        if !(0.0..=1.0).contains(&self.boss.crit_chance) {
            return Err(anyhow!("boss.crit_chance must be between 0 and 1"));
        }
        Ok(())
    }
}
