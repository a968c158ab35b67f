//! Game core: stat scaling, the monster catalog, loot tables, combat
//! resolution, the encounter state machine and its timer-paced runner, and the
//! dungeon grid.
//!
//! Everything here is storage-agnostic. Randomness comes in through
//! [`rng::RandomSource`] so tests can script exact rolls.

pub mod catalog;
pub mod combat;
pub mod dungeon;
pub mod encounter;
pub mod loot;
pub mod monsters;
pub mod rng;
pub mod runner;
pub mod scaling;

pub use combat::{Combatant, Skill};
pub use encounter::{Encounter, EncounterKind, EncounterRules, EncounterState, TurnOrder, TurnReport};
pub use loot::{ChestLoot, ChestRarity, DropResult};
pub use monsters::{MonsterDefinition, MonsterInstance, MonsterStats};
pub use rng::{RandomSource, ScriptedRolls};
pub use runner::{spawn_encounter, EncounterHandle};
pub use scaling::{atk_scale_multiplier, hp_scale_multiplier};
