//! # Abyssbot - Turn-Based Encounter and Economy Core
//!
//! The game engine behind a chat-platform RPG bot: monsters scale with the
//! player's world level, fights resolve one round per timer tick, chests and
//! drops feed an inventory, and timed actions are gated by per-player
//! cooldowns.
//!
//! ## Features
//!
//! - **Stat Scaling**: stepped accumulator curves for monster HP and attack.
//! - **Monster Catalog**: static overworld monsters plus a 12-floor Abyss ladder.
//! - **Loot**: independent-roll monster drops, rarity-weighted chests, gathering.
//! - **Combat**: crits, defense, elemental reactions, passive skills, status ticks.
//! - **Encounters**: an explicit state machine driven by a Tokio timer task.
//! - **Dungeon**: grid maps with keys, locked doors and one-time chests.
//! - **Economy**: leases, cooldowns, a shared prize pool, expeditions, crafting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use abyssbot::config::Config;
//! use abyssbot::economy::{EconomyCoordinator, InMemoryLeaseStore, PrizePool, SystemClock};
//! use abyssbot::game::spawn_encounter;
//! use abyssbot::storage::GameStoreBuilder;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = Arc::new(GameStoreBuilder::new(config.storage.database_path()).open()?);
//!     let pool = Arc::new(PrizePool::new(config.economy.prize_pool_seed, config.prize_pool_lock_timeout()));
//!     let coordinator = EconomyCoordinator::new(
//!         store,
//!         InMemoryLeaseStore::new(SystemClock),
//!         SystemClock,
//!         pool,
//!         config.economy_settings(),
//!     );
//!     let mut rng = StdRng::from_entropy();
//!     coordinator.register("amber")?;
//!     let (encounter, guard) = coordinator.begin_hunt("amber", &mut rng)?;
//!     let (handle, _reports) = spawn_encounter(encounter, config.combat.turn_interval(), StdRng::from_entropy());
//!     let finished = handle.finish().await?;
//!     coordinator.finish_encounter(guard, &finished, &mut rng).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - scaling, catalog, loot, combat, encounters, dungeon
//! - [`economy`] - cooldowns, leases, prize pool, expeditions, crafting, coordinator
//! - [`storage`] - sled-backed player and wallet persistence
//! - [`config`] - TOML configuration
//! - [`errors`] - the shared error type

pub mod config;
pub mod economy;
pub mod errors;
pub mod game;
pub mod storage;
