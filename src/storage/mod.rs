//! # Storage Module - Player and Wallet Persistence
//!
//! Sled-backed persistence for player records and the wallet audit log.
//! Records are bincode-encoded under namespaced keys:
//!
//! ```text
//! players     players:<lowercase user id>      -> PlayerRecord
//! wallet_log  wallet:<lowercase user id>:<ns>  -> WalletEntry
//! ```
//!
//! Every read-modify-write goes through [`GameStore::modify_player`], a
//! compare-and-swap loop with a bounded retry budget. Losing every race yields
//! [`GameError::StaleWrite`] instead of silently dropping a concurrent change.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use abyssbot::storage::{GameStoreBuilder, PlayerStore, PlayerUpdate, WalletStore};
//!
//! fn main() -> Result<(), abyssbot::errors::GameError> {
//!     let store = GameStoreBuilder::new("./data/game").open()?;
//!     store.get_or_create_player("amber")?;
//!     store.update_player("amber", &PlayerUpdate::new().hp(50.0))?;
//!     store.add_balance("amber", 100, true, "welcome gift")?;
//!     Ok(())
//! }
//! ```

pub mod types;

use std::path::{Path, PathBuf};

use chrono::Utc;
use sled::IVec;

use crate::errors::GameError;
pub use types::{
    Cooldown, ExpeditionRecord, InventoryEntry, PlayerRecord, PlayerUpdate, WalletEntry,
    PLAYER_SCHEMA_VERSION,
};

const TREE_PLAYERS: &str = "players";
const TREE_WALLET_LOG: &str = "wallet_log";

pub const DEFAULT_WRITE_RETRIES: u32 = 3;

/// Player record persistence.
pub trait PlayerStore: Send + Sync {
    fn get_player(&self, user_id: &str) -> Result<PlayerRecord, GameError>;

    /// Insert or overwrite a whole record.
    fn put_player(&self, player: PlayerRecord) -> Result<(), GameError>;

    /// Apply a partial update atomically and return the stored result.
    fn update_player(&self, user_id: &str, update: &PlayerUpdate)
        -> Result<PlayerRecord, GameError>;

    fn get_or_create_player(&self, user_id: &str) -> Result<PlayerRecord, GameError> {
        match self.get_player(user_id) {
            Ok(p) => Ok(p),
            Err(GameError::NotFound(_)) => {
                let record = PlayerRecord::new(user_id);
                self.put_player(record.clone())?;
                Ok(record)
            }
            Err(e) => Err(e),
        }
    }
}

/// Coin balance operations. `log` controls whether an audit entry is written.
pub trait WalletStore: Send + Sync {
    fn balance(&self, user_id: &str) -> Result<u64, GameError>;

    fn add_balance(&self, user_id: &str, amount: u64, log: bool, reason: &str)
        -> Result<u64, GameError>;

    /// Fails with [`GameError::InsufficientFunds`] without touching the balance.
    fn remove_balance(
        &self,
        user_id: &str,
        amount: u64,
        log: bool,
        reason: &str,
    ) -> Result<u64, GameError>;

    fn wallet_log(&self, user_id: &str) -> Result<Vec<WalletEntry>, GameError>;
}

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    write_retries: u32,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }

    /// Compare-and-swap attempts per update before giving up. Minimum one.
    pub fn write_retries(mut self, attempts: u32) -> Self {
        self.write_retries = attempts.max(1);
        self
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        GameStore::open_with_options(self.path, self.write_retries)
    }
}

/// Sled-backed persistence for player state and wallet history.
pub struct GameStore {
    db: sled::Db,
    players: sled::Tree,
    wallet_log: sled::Tree,
    write_retries: u32,
}

impl GameStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Self::open_with_options(path, DEFAULT_WRITE_RETRIES)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, write_retries: u32) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let wallet_log = db.open_tree(TREE_WALLET_LOG)?;
        Ok(Self {
            db,
            players,
            wallet_log,
            write_retries,
        })
    }

    fn players_key(user_id: &str) -> Vec<u8> {
        format!("players:{}", user_id.to_ascii_lowercase()).into_bytes()
    }

    fn wallet_prefix(user_id: &str) -> Vec<u8> {
        format!("wallet:{}:", user_id.to_ascii_lowercase()).into_bytes()
    }

    /// Timestamp-ordered key; the sled-generated id keeps entries written in
    /// the same clock tick apart.
    fn wallet_key(&self, user_id: &str) -> Result<Vec<u8>, GameError> {
        Ok(format!(
            "wallet:{}:{:020}:{:020}",
            user_id.to_ascii_lowercase(),
            next_timestamp_nanos(),
            self.db.generate_id()?
        )
        .into_bytes())
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(bytes)?)
    }

    fn decode_player(bytes: &IVec) -> Result<PlayerRecord, GameError> {
        let record: PlayerRecord = Self::deserialize(bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Read-modify-write a player under compare-and-swap.
    ///
    /// `f` runs against a fresh copy on every attempt; an `Err` from it aborts
    /// without writing. Returns [`GameError::StaleWrite`] once the retry budget
    /// is spent.
    pub fn modify_player<F>(&self, user_id: &str, mut f: F) -> Result<PlayerRecord, GameError>
    where
        F: FnMut(&mut PlayerRecord) -> Result<(), GameError>,
    {
        let key = Self::players_key(user_id);
        for attempt in 1..=self.write_retries {
            let Some(current) = self.players.get(&key)? else {
                return Err(GameError::NotFound(format!("player: {}", user_id)));
            };
            let mut record = Self::decode_player(&current)?;
            f(&mut record)?;
            record.schema_version = PLAYER_SCHEMA_VERSION;
            record.touch();
            let bytes = Self::serialize(&record)?;
            match self.players.compare_and_swap(&key, Some(current), Some(bytes))? {
                Ok(()) => {
                    self.players.flush()?;
                    return Ok(record);
                }
                Err(_) => {
                    log::debug!(
                        "player {} changed during update (attempt {}/{})",
                        user_id,
                        attempt,
                        self.write_retries
                    );
                }
            }
        }
        log::warn!(
            "giving up on player {} after {} conflicting writes",
            user_id,
            self.write_retries
        );
        Err(GameError::StaleWrite {
            attempts: self.write_retries,
        })
    }

    pub fn list_player_ids(&self) -> Result<Vec<String>, GameError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(b"players:") {
            let (_, value) = entry?;
            let record = Self::decode_player(&value)?;
            ids.push(record.user_id);
        }
        ids.sort();
        Ok(ids)
    }

    fn append_wallet_entry(&self, entry: &WalletEntry) -> Result<(), GameError> {
        let bytes = Self::serialize(entry)?;
        self.wallet_log.insert(self.wallet_key(&entry.user_id)?, bytes)?;
        self.wallet_log.flush()?;
        Ok(())
    }
}

impl PlayerStore for GameStore {
    fn get_player(&self, user_id: &str) -> Result<PlayerRecord, GameError> {
        let key = Self::players_key(user_id);
        let Some(bytes) = self.players.get(&key)? else {
            return Err(GameError::NotFound(format!("player: {}", user_id)));
        };
        Self::decode_player(&bytes)
    }

    fn put_player(&self, mut player: PlayerRecord) -> Result<(), GameError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        player.touch();
        let key = Self::players_key(&player.user_id);
        let bytes = Self::serialize(&player)?;
        self.players.insert(key, bytes)?;
        self.players.flush()?;
        Ok(())
    }

    fn update_player(
        &self,
        user_id: &str,
        update: &PlayerUpdate,
    ) -> Result<PlayerRecord, GameError> {
        self.modify_player(user_id, |player| {
            update.apply(player).map_err(GameError::MissingMaterials)
        })
    }
}

impl WalletStore for GameStore {
    fn balance(&self, user_id: &str) -> Result<u64, GameError> {
        Ok(self.get_player(user_id)?.balance)
    }

    fn add_balance(
        &self,
        user_id: &str,
        amount: u64,
        log: bool,
        reason: &str,
    ) -> Result<u64, GameError> {
        let record = self.modify_player(user_id, |player| {
            player.balance = player.balance.saturating_add(amount);
            Ok(())
        })?;
        if log {
            self.append_wallet_entry(&WalletEntry {
                user_id: record.user_id.clone(),
                delta: i64::try_from(amount).unwrap_or(i64::MAX),
                balance_after: record.balance,
                reason: reason.to_string(),
                at: Utc::now(),
            })?;
        }
        Ok(record.balance)
    }

    fn remove_balance(
        &self,
        user_id: &str,
        amount: u64,
        log: bool,
        reason: &str,
    ) -> Result<u64, GameError> {
        let record = self.modify_player(user_id, |player| {
            if player.balance < amount {
                return Err(GameError::InsufficientFunds);
            }
            player.balance -= amount;
            Ok(())
        })?;
        if log {
            self.append_wallet_entry(&WalletEntry {
                user_id: record.user_id.clone(),
                delta: -i64::try_from(amount).unwrap_or(i64::MAX),
                balance_after: record.balance,
                reason: reason.to_string(),
                at: Utc::now(),
            })?;
        }
        Ok(record.balance)
    }

    fn wallet_log(&self, user_id: &str) -> Result<Vec<WalletEntry>, GameError> {
        let mut entries = Vec::new();
        for entry in self.wallet_log.scan_prefix(Self::wallet_prefix(user_id)) {
            let (_, value) = entry?;
            entries.push(Self::deserialize::<WalletEntry>(&value)?);
        }
        Ok(entries)
    }
}
