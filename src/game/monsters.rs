//! Monster definitions and per-level instantiation.

use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use super::scaling::{atk_scale_multiplier, hp_scale_multiplier};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Physical,
    /// Burns the player every monster turn.
    Pyro,
    /// Occasionally cripples the player for extra damage.
    Cryo,
    /// Can stun the player, negating their attack.
    Electro,
    /// Can dodge the player's attack.
    Anemo,
    Hydro,
    Geo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MonsterGroup {
    Slime,
    Hilichurl,
    Beast,
    Elemental,
    Construct,
    Abyssal,
}

/// One independently rolled entry of a monster's drop table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropEntry {
    pub item: &'static str,
    pub min: u32,
    pub max: u32,
    /// Percent chance in `0..=100`.
    pub chance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonsterDefinition {
    pub name: &'static str,
    pub group: MonsterGroup,
    pub element: Element,
    pub base_hp: f64,
    pub base_atk: f64,
    pub crit_chance: f64,
    pub crit_value: f64,
    pub def_chance: f64,
    pub def_value: f64,
    pub min_level: u32,
    pub drops: &'static [DropEntry],
    pub image: &'static str,
}

/// Stat bounds of a monster at one progression level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonsterStats {
    pub level: u32,
    pub min_hp: f64,
    pub max_hp: f64,
    pub min_damage: f64,
    pub max_damage: f64,
}

impl MonsterDefinition {
    /// Stat bounds at `level`, or `None` when the level is below this monster's gate.
    pub fn stats_at(&self, level: i64) -> Option<MonsterStats> {
        if level < 1 || level < self.min_level as i64 {
            return None;
        }
        let hp = self.base_hp * hp_scale_multiplier(level);
        let atk = self.base_atk * atk_scale_multiplier(level);
        Some(MonsterStats {
            level: u32::try_from(level).unwrap_or(u32::MAX),
            min_hp: settle(hp * 0.9).ceil(),
            max_hp: settle(hp * 1.1).ceil(),
            min_damage: settle(atk * 0.95).floor(),
            max_damage: settle(atk * 1.05).ceil(),
        })
    }

    /// Create a fighting instance with HP rolled inside the level's bounds.
    pub fn spawn<R: RandomSource + ?Sized>(
        &'static self,
        level: i64,
        rng: &mut R,
    ) -> Option<MonsterInstance> {
        let stats = self.stats_at(level)?;
        let spread = stats.max_hp - stats.min_hp;
        let hp = (stats.min_hp + (rng.next_f64() * (spread + 1.0)).floor()).min(stats.max_hp);
        Some(MonsterInstance {
            definition: self,
            stats,
            hp,
            max_hp: hp,
        })
    }
}

/// Drop binary-fraction noise (`10.0 * 1.1 == 11.000000000000002`) before rounding.
fn settle(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// A monster inside one encounter. Dropped when the encounter ends.
#[derive(Debug, Clone)]
pub struct MonsterInstance {
    pub definition: &'static MonsterDefinition,
    pub stats: MonsterStats,
    pub hp: f64,
    pub max_hp: f64,
}

impl MonsterInstance {
    pub fn name(&self) -> &'static str {
        self.definition.name
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}
