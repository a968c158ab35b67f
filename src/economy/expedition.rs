//! Timed expeditions.
//!
//! A player sends themselves away for a fixed duration and claims a reward on
//! return. While away they are `is_travelling` and cannot hunt. Stored records
//! that are missing fields, or point at an unknown destination, are treated as
//! corrupted and reset rather than left to block the player.

use uuid::Uuid;

use crate::game::loot::{merge_drops, resolve_gather, DropResult};
use crate::game::rng::RandomSource;
use crate::storage::types::ExpeditionRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub name: &'static str,
    pub duration_secs: i64,
    pub coins: u64,
    /// Gathering rolls granted on return.
    pub material_rolls: u32,
}

pub static DESTINATIONS: &[Destination] = &[
    Destination {
        name: "Whispering Woods",
        duration_secs: 60 * 60,
        coins: 300,
        material_rolls: 2,
    },
    Destination {
        name: "Starfell Lake",
        duration_secs: 4 * 60 * 60,
        coins: 1_000,
        material_rolls: 5,
    },
    Destination {
        name: "Dadaupa Gorge",
        duration_secs: 8 * 60 * 60,
        coins: 2_200,
        material_rolls: 9,
    },
    Destination {
        name: "Stormterror's Lair",
        duration_secs: 20 * 60 * 60,
        coins: 6_000,
        material_rolls: 20,
    },
];

pub fn find_destination(name: &str) -> Option<&'static Destination> {
    let name = name.trim();
    DESTINATIONS.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

/// A stored expedition whose fields all check out.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveExpedition {
    pub id: Uuid,
    pub destination: &'static Destination,
    pub started_at_ms: i64,
    pub ends_at_ms: i64,
}

impl ActiveExpedition {
    pub fn is_complete(&self, now_ms: i64) -> bool {
        now_ms >= self.ends_at_ms
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpeditionClaim {
    Completed {
        destination: &'static str,
        coins: u64,
        items: Vec<DropResult>,
    },
    NotReady {
        destination: &'static str,
        ends_at_ms: i64,
    },
    /// Stored metadata was unusable; the expedition and travel flag were cleared.
    CorruptedReset,
}

pub fn plan(destination: &Destination, now_ms: i64) -> ExpeditionRecord {
    ExpeditionRecord {
        id: Some(Uuid::new_v4()),
        destination: Some(destination.name.to_string()),
        started_at_ms: Some(now_ms),
        ends_at_ms: Some(now_ms.saturating_add(destination.duration_secs.saturating_mul(1000))),
    }
}

/// `None` when the record is corrupted.
pub fn validate(record: &ExpeditionRecord) -> Option<ActiveExpedition> {
    let id = record.id?;
    let destination = find_destination(record.destination.as_deref()?)?;
    let started_at_ms = record.started_at_ms?;
    let ends_at_ms = record.ends_at_ms?;
    if ends_at_ms < started_at_ms {
        return None;
    }
    Some(ActiveExpedition {
        id,
        destination,
        started_at_ms,
        ends_at_ms,
    })
}

pub fn roll_rewards<R: RandomSource + ?Sized>(
    destination: &Destination,
    level: u32,
    rng: &mut R,
) -> (u64, Vec<DropResult>) {
    let hauls = (0..destination.material_rolls).filter_map(|_| resolve_gather(level, rng));
    (destination.coins, merge_drops(hauls))
}
