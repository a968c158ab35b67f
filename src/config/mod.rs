//! # Configuration Management Module
//!
//! TOML configuration for the bot: storage location, logging, combat pacing,
//! per-action cooldowns, and economy tuning. Every section has defaults so a
//! partial file loads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use abyssbot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("turn interval: {} ms", config.combat.turn_interval_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! name = "Abyss Bot"
//! starting_balance = 500
//!
//! [storage]
//! data_dir = "./data"
//!
//! [combat]
//! turn_interval_ms = 3000
//! max_turns = 200
//! player_first = false
//!
//! [cooldowns]
//! hunt = 60
//! explore = 600
//!
//! [economy]
//! lease_ttl_secs = 60
//! abyss_entry_fee = 50
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

use crate::economy::{CooldownDurations, EconomySettings, StartingStats};
use crate::game::{EncounterRules, TurnOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    pub starting_balance: u64,
    pub starting_hp: f64,
    pub starting_attack: f64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "Abyss Bot".to_string(),
            starting_balance: 500,
            starting_hp: 100.0,
            starting_attack: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("game")
    }

    pub fn prize_pool_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("prize_pool.json")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    /// Wallet movements (target `economy`) are also appended here when set.
    pub economy_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            economy_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub turn_interval_ms: u64,
    pub max_turns: u32,
    /// Player strikes first in each round when true.
    pub player_first: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            turn_interval_ms: 3000,
            max_turns: 200,
            player_first: false,
        }
    }
}

impl CombatConfig {
    pub fn turn_interval(&self) -> Duration {
        Duration::from_millis(self.turn_interval_ms)
    }

    pub fn rules(&self) -> EncounterRules {
        EncounterRules {
            turn_order: if self.player_first {
                TurnOrder::PlayerFirst
            } else {
                TurnOrder::MonsterFirst
            },
            max_turns: self.max_turns,
        }
    }
}

/// Cooldown lengths in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub hunt: u64,
    pub abyss: u64,
    pub explore: u64,
    pub gather: u64,
    pub craft: u64,
    pub cook: u64,
    pub expedition: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        let d = CooldownDurations::default();
        Self {
            hunt: d.hunt.as_secs(),
            abyss: d.abyss.as_secs(),
            explore: d.explore.as_secs(),
            gather: d.gather.as_secs(),
            craft: d.craft.as_secs(),
            cook: d.cook.as_secs(),
            expedition: d.expedition.as_secs(),
        }
    }
}

impl CooldownConfig {
    pub fn durations(&self) -> CooldownDurations {
        CooldownDurations {
            hunt: Duration::from_secs(self.hunt),
            abyss: Duration::from_secs(self.abyss),
            explore: Duration::from_secs(self.explore),
            gather: Duration::from_secs(self.gather),
            craft: Duration::from_secs(self.craft),
            cook: Duration::from_secs(self.cook),
            expedition: Duration::from_secs(self.expedition),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub lease_ttl_secs: u64,
    pub prize_pool_lock_timeout_ms: u64,
    pub abyss_entry_fee: u64,
    pub prize_pool_seed: u64,
    pub store_write_retries: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            lease_ttl_secs: 60,
            prize_pool_lock_timeout_ms: 500,
            abyss_entry_fee: 50,
            prize_pool_seed: 1000,
            store_write_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

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

    pub fn validate(&self) -> Result<()> {
        if self.combat.turn_interval_ms == 0 {
            return Err(anyhow!("combat.turn_interval_ms must be greater than zero"));
        }
        if self.combat.max_turns == 0 {
            return Err(anyhow!("combat.max_turns must be greater than zero"));
        }
        if self.economy.lease_ttl_secs == 0 {
            return Err(anyhow!("economy.lease_ttl_secs must be greater than zero"));
        }
        if self.economy.store_write_retries == 0 {
            return Err(anyhow!("economy.store_write_retries must be at least 1"));
        }
        if self.bot.starting_hp.is_nan() || self.bot.starting_hp <= 0.0 {
            return Err(anyhow!("bot.starting_hp must be positive"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        Ok(())
    }

    pub fn economy_settings(&self) -> EconomySettings {
        EconomySettings {
            cooldowns: self.cooldowns.durations(),
            lease_ttl: Duration::from_secs(self.economy.lease_ttl_secs),
            rules: self.combat.rules(),
            abyss_entry_fee: self.economy.abyss_entry_fee,
            starting: StartingStats {
                balance: self.bot.starting_balance,
                hp: self.bot.starting_hp,
                attack: self.bot.starting_attack,
            },
        }
    }

    pub fn prize_pool_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.economy.prize_pool_lock_timeout_ms)
    }
}
