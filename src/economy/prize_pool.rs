//! Shared Abyss prize pool.
//!
//! Entry fees accumulate in one global pot; clearing a boss floor pays out the
//! whole pot and resets it to the seed value. The pot sits behind a
//! `tokio::sync::Mutex` that callers may only wait on for a bounded time. When a
//! snapshot path is configured the pot is persisted as pretty JSON after every
//! change.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::errors::GameError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub value: u64,
    pub last_payout: Option<DateTime<Utc>>,
    pub last_winner: Option<String>,
    pub last_amount: Option<u64>,
}

pub struct PrizePool {
    state: Mutex<PoolState>,
    seed: u64,
    lock_timeout: Duration,
    snapshot: Option<PathBuf>,
}

impl PrizePool {
    /// In-memory pool starting at `seed`.
    pub fn new(seed: u64, lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState {
                value: seed,
                ..PoolState::default()
            }),
            seed,
            lock_timeout,
            snapshot: None,
        }
    }

    /// Pool persisted at `path`; starts at `seed` when the file is absent or unreadable.
    pub async fn load(path: impl Into<PathBuf>, seed: u64, lock_timeout: Duration) -> Self {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<PoolState>(&content) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("prize pool snapshot {} unreadable ({}), reseeding", path.display(), e);
                    PoolState { value: seed, ..PoolState::default() }
                }
            },
            Err(_) => PoolState { value: seed, ..PoolState::default() },
        };
        Self {
            state: Mutex::new(state),
            seed,
            lock_timeout,
            snapshot: Some(path),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, PoolState>, GameError> {
        tokio::time::timeout(self.lock_timeout, self.state.lock())
            .await
            .map_err(|_| {
                log::warn!("prize pool lock not acquired within {:?}", self.lock_timeout);
                GameError::LockTimeout
            })
    }

    async fn persist(&self, state: &PoolState) -> Result<(), GameError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(state)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    pub async fn value(&self) -> Result<u64, GameError> {
        Ok(self.lock().await?.value)
    }

    pub async fn snapshot(&self) -> Result<PoolState, GameError> {
        Ok(self.lock().await?.clone())
    }

    /// Add to the pot. Returns the new value.
    pub async fn contribute(&self, amount: u64) -> Result<u64, GameError> {
        let mut state = self.lock().await?;
        state.value = state.value.saturating_add(amount);
        self.persist(&state).await?;
        Ok(state.value)
    }

    /// Take the whole pot for `winner` and reset to the seed. Returns the payout.
    pub async fn payout_and_reset(&self, winner: &str) -> Result<u64, GameError> {
        let mut state = self.lock().await?;
        let payout = state.value;
        state.value = self.seed;
        state.last_payout = Some(Utc::now());
        state.last_winner = Some(winner.to_string());
        state.last_amount = Some(payout);
        self.persist(&state).await?;
        log::info!(target: "economy", "prize pool of {} paid to {}", payout, winner);
        Ok(payout)
    }

    /// Take back a contribution whose entry never went ahead. Never drops below zero.
    pub async fn reclaim(&self, amount: u64) -> Result<u64, GameError> {
        let mut state = self.lock().await?;
        state.value = state.value.saturating_sub(amount);
        self.persist(&state).await?;
        log::info!(target: "economy", "prize pool reclaimed {}, now {}", amount, state.value);
        Ok(state.value)
    }

    /// Undo a payout that could not be recorded for the winner. The reset seed
    /// is replaced by the payout; contributions made since are kept.
    pub async fn restore_payout(&self, amount: u64) -> Result<u64, GameError> {
        let mut state = self.lock().await?;
        state.value = state.value.saturating_sub(self.seed).saturating_add(amount);
        state.last_winner = None;
        state.last_amount = None;
        self.persist(&state).await?;
        log::warn!(target: "economy", "prize pool payout of {} restored, now {}", amount, state.value);
        Ok(state.value)
    }

    /// Hold the pool lock so callers hit the timeout.
    #[cfg(test)]
    pub(crate) async fn hold(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().await
    }
}
