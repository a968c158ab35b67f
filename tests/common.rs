//! Shared fixtures: a coordinator over a throwaway sled store and a manual clock.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use abyssbot::economy::{
    EconomyCoordinator, EconomySettings, InMemoryLeaseStore, ManualClock, PrizePool,
};
use abyssbot::game::{EncounterRules, TurnOrder};
use abyssbot::storage::{GameStore, GameStoreBuilder, PlayerStore};
use tempfile::TempDir;

pub type TestCoordinator =
    EconomyCoordinator<GameStore, InMemoryLeaseStore<Arc<ManualClock>>, Arc<ManualClock>>;

pub const START_MS: i64 = 1_700_000_000_000;
pub const POOL_SEED: u64 = 100;

pub struct Harness {
    // keeps the database directory alive
    _dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub coord: TestCoordinator,
}

impl Harness {
    pub fn store(&self) -> &GameStore {
        self.coord.store()
    }
}

pub fn harness() -> Harness {
    harness_with(EconomySettings::default())
}

pub fn harness_with(settings: EconomySettings) -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let store = GameStoreBuilder::new(dir.path().join("game"))
        .open()
        .expect("open store");
    let clock = Arc::new(ManualClock::new(START_MS));
    let leases = InMemoryLeaseStore::new(Arc::clone(&clock));
    let pool = Arc::new(PrizePool::new(POOL_SEED, Duration::from_millis(250)));
    let coord = EconomyCoordinator::new(Arc::new(store), leases, Arc::clone(&clock), pool, settings);
    Harness {
        _dir: dir,
        clock,
        coord,
    }
}

/// Settings where the player swings first; handy for one-hit fights.
pub fn player_first() -> EconomySettings {
    EconomySettings {
        rules: EncounterRules {
            turn_order: TurnOrder::PlayerFirst,
            max_turns: 200,
        },
        ..EconomySettings::default()
    }
}

/// Register `user` and make them strong enough to one-shot anything.
pub fn champion(h: &Harness, user: &str) {
    let mut p = h.coord.register(user).expect("register");
    p.hp = 1e9;
    p.max_hp = 1e9;
    p.attack_power = 1e7;
    p.crit_chance = 0.0;
    h.store().put_player(p).expect("put");
}
