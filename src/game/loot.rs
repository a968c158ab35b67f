//! Loot resolution.
//!
//! Three separate sampling schemes live here and are deliberately not merged:
//! - chests: weighted rarity tier, then exclusive picks from a level-gated pool
//! - monster kills: every drop entry rolls independently
//! - gathering: one exclusive weighted pick from the material table
//!
//! Every loop is bounded and every emitted quantity is at least 1. Running out
//! of candidates yields an empty result, never an error.

use serde::{Deserialize, Serialize};

use super::monsters::MonsterDefinition;
use super::rng::RandomSource;
use super::scaling::atk_scale_multiplier;

/// Attempts per chest slot before giving up on that slot.
pub const MAX_PICK_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResult {
    pub item: String,
    pub quantity: u32,
}

impl DropResult {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity: quantity.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestRarity {
    Common,
    Exquisite,
    Precious,
    Luxurious,
    Remarkable,
}

/// Tier weights; they sum to 100.
pub const RARITY_WEIGHTS: [(ChestRarity, u32); 5] = [
    (ChestRarity::Common, 26),
    (ChestRarity::Exquisite, 51),
    (ChestRarity::Precious, 13),
    (ChestRarity::Luxurious, 7),
    (ChestRarity::Remarkable, 3),
];

/// Stack sizes 1..=5 for stackable chest items.
pub const QUANTITY_WEIGHTS: [(u32, u32); 5] = [(1, 40), (2, 30), (3, 15), (4, 10), (5, 5)];

impl ChestRarity {
    pub fn max_items(&self) -> usize {
        match self {
            ChestRarity::Common => 2,
            ChestRarity::Exquisite => 3,
            ChestRarity::Precious => 4,
            ChestRarity::Luxurious => 5,
            ChestRarity::Remarkable => 6,
        }
    }

    /// Unscaled coin range.
    pub fn coin_range(&self) -> (u32, u32) {
        match self {
            ChestRarity::Common => (50, 150),
            ChestRarity::Exquisite => (100, 250),
            ChestRarity::Precious => (200, 450),
            ChestRarity::Luxurious => (400, 800),
            ChestRarity::Remarkable => (800, 1500),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChestRarity::Common => "Common",
            ChestRarity::Exquisite => "Exquisite",
            ChestRarity::Precious => "Precious",
            ChestRarity::Luxurious => "Luxurious",
            ChestRarity::Remarkable => "Remarkable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestLoot {
    pub rarity: ChestRarity,
    pub items: Vec<DropResult>,
    pub coins: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Material,
    Consumable,
    Weapon,
    Artifact,
}

impl ItemKind {
    pub fn stackable(&self) -> bool {
        matches!(self, ItemKind::Material | ItemKind::Consumable)
    }
}

/// Entry of the global chest pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDefinition {
    pub name: &'static str,
    pub kind: ItemKind,
    pub min_level: u32,
    /// Percent chance in `0..=100` that a pick of this item sticks.
    pub chance: f64,
}

const fn item(name: &'static str, kind: ItemKind, min_level: u32, chance: f64) -> ItemDefinition {
    ItemDefinition {
        name,
        kind,
        min_level,
        chance,
    }
}

pub static CHEST_POOL: &[ItemDefinition] = &[
    item("Mora Pouch", ItemKind::Consumable, 1, 90.0),
    item("Sweet Madame", ItemKind::Consumable, 1, 70.0),
    item("Mondstadt Hash Brown", ItemKind::Consumable, 3, 60.0),
    item("Adventurer's Experience", ItemKind::Material, 1, 80.0),
    item("Hero's Wit", ItemKind::Material, 10, 30.0),
    item("Mystic Enhancement Ore", ItemKind::Material, 5, 50.0),
    item("Crystal Chunk", ItemKind::Material, 3, 55.0),
    item("Iron Chunk", ItemKind::Material, 1, 85.0),
    item("Magical Crystal Chunk", ItemKind::Material, 15, 25.0),
    item("Dull Blade", ItemKind::Weapon, 1, 40.0),
    item("Silver Sword", ItemKind::Weapon, 3, 30.0),
    item("Harbinger of Dawn", ItemKind::Weapon, 8, 15.0),
    item("Favonius Lance", ItemKind::Weapon, 15, 8.0),
    item("Wolf's Gravestone", ItemKind::Weapon, 25, 3.0),
    item("Adventurer's Flower", ItemKind::Artifact, 1, 45.0),
    item("Lucky Dog's Clover", ItemKind::Artifact, 5, 30.0),
    item("Gladiator's Nostalgia", ItemKind::Artifact, 12, 12.0),
    item("Crimson Witch's Flower", ItemKind::Artifact, 20, 5.0),
];

/// Material gathered in the open world: `(item, weight, min_level)`.
pub static GATHER_TABLE: &[(&str, u32, u32)] = &[
    ("Sweet Flower", 30, 1),
    ("Mint", 30, 1),
    ("Wolfhook", 20, 1),
    ("Cecilia", 10, 3),
    ("Windwheel Aster", 10, 5),
    ("Noctilucous Jade", 6, 8),
    ("Cor Lapis", 5, 12),
    ("Crystal Marrow", 2, 20),
];

/// Walk a weight table with a roll already scaled to `0..total`.
///
/// Returns the bucket containing `roll`; rolls past the end land in the last bucket.
pub fn pick_weighted<T: Copy>(table: &[(T, u32)], mut roll: f64) -> Option<T> {
    let last = table.last()?.0;
    for (value, weight) in table {
        let w = *weight as f64;
        if roll < w {
            return Some(*value);
        }
        roll -= w;
    }
    Some(last)
}

fn total_weight<T>(table: &[(T, u32)]) -> u32 {
    table.iter().map(|(_, w)| *w).sum()
}

/// Rarity tier for a roll in `0..100`. 25.999 is Common, 26.0 is Exquisite.
pub fn rarity_for_roll(roll: f64) -> ChestRarity {
    pick_weighted(&RARITY_WEIGHTS, roll).unwrap_or(ChestRarity::Common)
}

pub fn roll_rarity<R: RandomSource + ?Sized>(rng: &mut R) -> ChestRarity {
    let roll = rng.next_f64() * total_weight(&RARITY_WEIGHTS) as f64;
    rarity_for_roll(roll)
}

pub fn roll_quantity<R: RandomSource + ?Sized>(rng: &mut R) -> u32 {
    let roll = rng.next_f64() * total_weight(&QUANTITY_WEIGHTS) as f64;
    pick_weighted(&QUANTITY_WEIGHTS, roll).unwrap_or(1)
}

/// Chest pool entries unlocked at `level`.
pub fn chest_candidates(level: u32) -> Vec<&'static ItemDefinition> {
    CHEST_POOL.iter().filter(|i| i.min_level <= level).collect()
}

/// Fill the item slots of a chest of known rarity.
pub fn resolve_chest_items<R: RandomSource + ?Sized>(
    rarity: ChestRarity,
    mut candidates: Vec<&'static ItemDefinition>,
    rng: &mut R,
) -> Vec<DropResult> {
    let mut items = Vec::new();
    let mut has_weapon = false;

    for _ in 0..rarity.max_items() {
        if candidates.is_empty() {
            break;
        }
        for _ in 0..MAX_PICK_ATTEMPTS {
            let idx = rng.pick_index(candidates.len());
            let pick = candidates[idx];
            if pick.kind == ItemKind::Weapon && has_weapon {
                continue;
            }
            if !rng.chance(pick.chance) {
                continue;
            }
            let quantity = if pick.kind.stackable() {
                roll_quantity(rng)
            } else {
                1
            };
            if pick.kind == ItemKind::Weapon {
                has_weapon = true;
            }
            candidates.swap_remove(idx);
            items.push(DropResult::new(pick.name, quantity));
            break;
        }
    }
    items
}

/// Open a chest at `level`: rarity, items, and coins.
pub fn resolve_chest<R: RandomSource + ?Sized>(level: u32, rng: &mut R) -> ChestLoot {
    let rarity = roll_rarity(rng);
    resolve_chest_of(rarity, level, rng)
}

pub fn resolve_chest_of<R: RandomSource + ?Sized>(
    rarity: ChestRarity,
    level: u32,
    rng: &mut R,
) -> ChestLoot {
    let items = resolve_chest_items(rarity, chest_candidates(level), rng);
    let (lo, hi) = rarity.coin_range();
    let base = rng.range_inclusive(lo, hi) as f64;
    let coins = (base * atk_scale_multiplier(level as i64)).round() as u64;
    log::debug!(
        "chest resolved: rarity={} items={} coins={}",
        rarity.label(),
        items.len(),
        coins
    );
    ChestLoot {
        rarity,
        items,
        coins,
    }
}

/// Roll every drop entry of a defeated monster independently.
pub fn resolve_monster_drops<R: RandomSource + ?Sized>(
    monster: &MonsterDefinition,
    rng: &mut R,
) -> Vec<DropResult> {
    monster
        .drops
        .iter()
        .filter_map(|entry| {
            if !rng.chance(entry.chance) {
                return None;
            }
            let min = entry.min.max(1);
            let max = entry.max.max(min);
            Some(DropResult::new(entry.item, rng.range_inclusive(min, max)))
        })
        .collect()
}

/// One gathering haul, or `None` if nothing is gatherable at `level`.
pub fn resolve_gather<R: RandomSource + ?Sized>(level: u32, rng: &mut R) -> Option<DropResult> {
    let table: Vec<(&'static str, u32)> = GATHER_TABLE
        .iter()
        .filter(|(_, _, min)| *min <= level)
        .map(|(name, weight, _)| (*name, *weight))
        .collect();
    let total = total_weight(&table);
    if total == 0 {
        return None;
    }
    let name = pick_weighted(&table, rng.next_f64() * total as f64)?;
    Some(DropResult::new(name, roll_quantity(rng)))
}

/// Fold drops of the same item together, keeping first-seen order.
pub fn merge_drops(drops: impl IntoIterator<Item = DropResult>) -> Vec<DropResult> {
    let mut merged: Vec<DropResult> = Vec::new();
    for drop in drops {
        match merged.iter_mut().find(|d| d.item == drop.item) {
            Some(existing) => existing.quantity += drop.quantity,
            None => merged.push(drop),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::WORLD_MONSTERS;
    use crate::game::rng::ScriptedRolls;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rarity_bucket_edges() {
        assert_eq!(rarity_for_roll(0.0), ChestRarity::Common);
        assert_eq!(rarity_for_roll(25.999), ChestRarity::Common);
        assert_eq!(rarity_for_roll(26.0), ChestRarity::Exquisite);
        assert_eq!(rarity_for_roll(76.999), ChestRarity::Exquisite);
        assert_eq!(rarity_for_roll(77.0), ChestRarity::Precious);
        assert_eq!(rarity_for_roll(97.0), ChestRarity::Remarkable);
        assert_eq!(rarity_for_roll(250.0), ChestRarity::Remarkable);
    }

    #[test]
    fn rarity_weights_sum_to_hundred() {
        assert_eq!(total_weight(&RARITY_WEIGHTS), 100);
        assert_eq!(total_weight(&QUANTITY_WEIGHTS), 100);
    }

    #[test]
    fn at_most_one_weapon_per_chest() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2_000 {
            let loot = resolve_chest_of(ChestRarity::Remarkable, 30, &mut rng);
            let weapons = loot
                .items
                .iter()
                .filter(|d| {
                    CHEST_POOL
                        .iter()
                        .any(|i| i.name == d.item && i.kind == ItemKind::Weapon)
                })
                .count();
            assert!(weapons <= 1);
            assert!(loot.items.len() <= ChestRarity::Remarkable.max_items());
            assert!(loot.items.iter().all(|d| d.quantity >= 1));
        }
    }

    #[test]
    fn chest_gives_up_when_every_roll_fails() {
        // fallback 0.999 fails every chance roll below 99.9%
        let mut rng = ScriptedRolls::new([]).with_fallback(0.999);
        let items = resolve_chest_items(ChestRarity::Luxurious, chest_candidates(30), &mut rng);
        assert!(items.is_empty());
    }

    #[test]
    fn chest_respects_level_gate() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let loot = resolve_chest(1, &mut rng);
            for d in &loot.items {
                let def = CHEST_POOL.iter().find(|i| i.name == d.item).unwrap();
                assert!(def.min_level <= 1);
            }
        }
    }

    #[test]
    fn empty_candidate_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(resolve_chest_items(ChestRarity::Common, Vec::new(), &mut rng).is_empty());
    }

    #[test]
    fn monster_drops_roll_independently() {
        let slime = &WORLD_MONSTERS[0];
        // every roll succeeds: all entries drop
        let mut lucky = ScriptedRolls::new([]).with_fallback(0.0);
        let drops = resolve_monster_drops(slime, &mut lucky);
        assert_eq!(drops.len(), slime.drops.len());
        // every roll fails: nothing drops
        let mut unlucky = ScriptedRolls::new([]).with_fallback(0.999_999);
        assert!(resolve_monster_drops(slime, &mut unlucky).is_empty());
    }

    #[test]
    fn gather_is_level_gated() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(resolve_gather(0, &mut rng).is_none());
        for _ in 0..500 {
            let haul = resolve_gather(1, &mut rng).unwrap();
            assert!(["Sweet Flower", "Mint", "Wolfhook"].contains(&haul.item.as_str()));
            assert!((1..=5).contains(&haul.quantity));
        }
    }

    #[test]
    fn merge_combines_same_items() {
        let merged = merge_drops(vec![
            DropResult::new("Mint", 2),
            DropResult::new("Wolfhook", 1),
            DropResult::new("Mint", 3),
        ]);
        assert_eq!(merged, vec![DropResult::new("Mint", 5), DropResult::new("Wolfhook", 1)]);
    }
}
