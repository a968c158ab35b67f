//! Player economy: cooldowns, leases, the shared prize pool, expeditions,
//! crafting, and the coordinator that sequences them around the store.

pub mod clock;
pub mod cooldown;
pub mod coordinator;
pub mod crafting;
pub mod expedition;
pub mod lease;
pub mod prize_pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{check_cooldown, set_cooldown, Action, CooldownStatus};
pub use coordinator::{
    CooldownDurations, DungeonMove, EconomyCoordinator, EconomySettings, EncounterSummary,
    HuntGuard, StartingStats,
};
pub use expedition::ExpeditionClaim;
pub use lease::{InMemoryLeaseStore, LeaseStore, LeaseToken};
pub use prize_pool::PrizePool;
