use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::{Combatant, Skill};
use crate::game::dungeon::{DungeonProgress, Position};
use crate::game::encounter::EntryFlags;
use crate::game::loot::DropResult;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

// ============================================================================
// Player Record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item: String,
    pub amount: u32,
}

/// Per-action timer. At most one per action key on a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub action: String,
    pub expires_at_ms: i64,
}

/// Expedition as persisted. Every field is optional on disk so that records
/// damaged by older writers can be detected and reset instead of failing to load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionRecord {
    pub id: Option<Uuid>,
    pub destination: Option<String>,
    pub started_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hp: f64,
    pub max_hp: f64,
    pub attack_power: f64,
    pub crit_chance: f64,
    pub crit_value: f64,
    pub def_chance: f64,
    pub def_value: f64,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
    /// World level / adventure rank.
    pub level: u32,
    /// Highest Abyss floor cleared.
    #[serde(default)]
    pub abyss_floor: u32,
    /// `None` until the player first enters the dungeon.
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub dungeon: DungeonProgress,
    #[serde(default)]
    pub cooldowns: Vec<Cooldown>,
    #[serde(default)]
    pub is_hunting: bool,
    #[serde(default)]
    pub is_travelling: bool,
    #[serde(default)]
    pub expedition: Option<ExpeditionRecord>,
    #[serde(default)]
    pub balance: u64,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            hp: 100.0,
            max_hp: 100.0,
            attack_power: 10.0,
            crit_chance: 5.0,
            crit_value: 1.5,
            def_chance: 5.0,
            def_value: 2.0,
            skills: Vec::new(),
            inventory: Vec::new(),
            level: 1,
            abyss_floor: 0,
            position: None,
            dungeon: DungeonProgress::default(),
            cooldowns: Vec::new(),
            is_hunting: false,
            is_travelling: false,
            expedition: None,
            balance: 0,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Combat snapshot for one encounter.
    pub fn combatant(&self) -> Combatant {
        Combatant::player(
            self.user_id.clone(),
            self.hp,
            self.max_hp,
            self.attack_power,
            self.crit_chance,
            self.crit_value,
            self.def_chance,
            self.def_value,
            self.skills.clone(),
        )
    }

    pub fn entry_flags(&self) -> EntryFlags {
        EntryFlags {
            is_hunting: self.is_hunting,
            is_travelling: self.is_travelling,
        }
    }

    pub fn item_amount(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .find(|e| e.item == item)
            .map(|e| e.amount)
            .unwrap_or(0)
    }

    pub fn add_item(&mut self, item: &str, amount: u32) {
        if amount == 0 {
            return;
        }
        match self.inventory.iter_mut().find(|e| e.item == item) {
            Some(entry) => entry.amount = entry.amount.saturating_add(amount),
            None => self.inventory.push(InventoryEntry {
                item: item.to_string(),
                amount,
            }),
        }
    }

    /// Remove `amount` of `item`. Returns false (and changes nothing) if short.
    pub fn remove_item(&mut self, item: &str, amount: u32) -> bool {
        let Some(idx) = self.inventory.iter().position(|e| e.item == item) else {
            return amount == 0;
        };
        if self.inventory[idx].amount < amount {
            return false;
        }
        self.inventory[idx].amount -= amount;
        if self.inventory[idx].amount == 0 {
            self.inventory.remove(idx);
        }
        true
    }
}

// ============================================================================
// Partial Updates
// ============================================================================

/// Partial player update. `None` fields are left alone; item lists are deltas.
///
/// Applied inside the store's compare-and-swap loop, so it must be replayable
/// against a freshly re-read record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerUpdate {
    pub hp: Option<f64>,
    pub max_hp: Option<f64>,
    pub attack_power: Option<f64>,
    pub level: Option<u32>,
    pub abyss_floor: Option<u32>,
    pub position: Option<Position>,
    pub dungeon: Option<DungeonProgress>,
    pub is_hunting: Option<bool>,
    pub is_travelling: Option<bool>,
    /// `Some(None)` clears the expedition.
    pub expedition: Option<Option<ExpeditionRecord>>,
    pub skills: Option<Vec<Skill>>,
    pub set_cooldown: Option<Cooldown>,
    pub add_items: Vec<DropResult>,
    pub remove_items: Vec<DropResult>,
}

impl PlayerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hp(mut self, hp: f64) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn hunting(mut self, on: bool) -> Self {
        self.is_hunting = Some(on);
        self
    }

    pub fn travelling(mut self, on: bool) -> Self {
        self.is_travelling = Some(on);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn abyss_floor(mut self, floor: u32) -> Self {
        self.abyss_floor = Some(floor);
        self
    }

    pub fn position(mut self, pos: Position) -> Self {
        self.position = Some(pos);
        self
    }

    pub fn dungeon(mut self, progress: DungeonProgress) -> Self {
        self.dungeon = Some(progress);
        self
    }

    pub fn expedition(mut self, expedition: Option<ExpeditionRecord>) -> Self {
        self.expedition = Some(expedition);
        self
    }

    pub fn cooldown(mut self, action: &str, expires_at_ms: i64) -> Self {
        self.set_cooldown = Some(Cooldown {
            action: action.to_string(),
            expires_at_ms,
        });
        self
    }

    pub fn add_items(mut self, items: impl IntoIterator<Item = DropResult>) -> Self {
        self.add_items.extend(items);
        self
    }

    pub fn remove_items(mut self, items: impl IntoIterator<Item = DropResult>) -> Self {
        self.remove_items.extend(items);
        self
    }

    /// Apply to `player`. Fails without partial effect when an item removal is short.
    pub fn apply(&self, player: &mut PlayerRecord) -> Result<(), String> {
        for r in &self.remove_items {
            if player.item_amount(&r.item) < r.quantity {
                return Err(r.item.clone());
            }
        }
        for r in &self.remove_items {
            player.remove_item(&r.item, r.quantity);
        }
        for a in &self.add_items {
            player.add_item(&a.item, a.quantity);
        }
        if let Some(max_hp) = self.max_hp {
            player.max_hp = max_hp.max(1.0);
        }
        if let Some(hp) = self.hp {
            player.hp = hp.clamp(0.0, player.max_hp);
        }
        if let Some(atk) = self.attack_power {
            player.attack_power = atk;
        }
        if let Some(level) = self.level {
            player.level = level.max(1);
        }
        if let Some(floor) = self.abyss_floor {
            player.abyss_floor = floor;
        }
        if let Some(pos) = self.position {
            player.position = Some(pos);
        }
        if let Some(progress) = &self.dungeon {
            player.dungeon = progress.clone();
        }
        if let Some(on) = self.is_hunting {
            player.is_hunting = on;
        }
        if let Some(on) = self.is_travelling {
            player.is_travelling = on;
        }
        if let Some(expedition) = &self.expedition {
            player.expedition = expedition.clone();
        }
        if let Some(skills) = &self.skills {
            player.skills = skills.clone();
        }
        if let Some(cd) = &self.set_cooldown {
            crate::economy::cooldown::set_cooldown_until(
                &mut player.cooldowns,
                &cd.action,
                cd.expires_at_ms,
            );
        }
        Ok(())
    }
}

// ============================================================================
// Wallet Log
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub user_id: String,
    /// Positive for credits, negative for debits.
    pub delta: i64,
    pub balance_after: u64,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_add_and_remove() {
        let mut p = PlayerRecord::new("amber");
        p.add_item("Mint", 3);
        p.add_item("Mint", 2);
        p.add_item("Nothing", 0);
        assert_eq!(p.item_amount("Mint"), 5);
        assert_eq!(p.inventory.len(), 1);
        assert!(!p.remove_item("Mint", 6));
        assert!(p.remove_item("Mint", 5));
        assert!(p.inventory.is_empty());
        assert!(!p.remove_item("Mint", 1));
    }

    #[test]
    fn update_is_all_or_nothing_on_short_items() {
        let mut p = PlayerRecord::new("amber");
        p.add_item("Mint", 1);
        let upd = PlayerUpdate::new()
            .hp(5.0)
            .remove_items([DropResult::new("Mint", 2)])
            .add_items([DropResult::new("Salad", 1)]);
        assert_eq!(upd.apply(&mut p), Err("Mint".to_string()));
        assert_eq!(p.hp, 100.0);
        assert_eq!(p.item_amount("Salad"), 0);
    }

    #[test]
    fn update_clamps_hp_and_replaces_cooldown() {
        let mut p = PlayerRecord::new("amber");
        PlayerUpdate::new().hp(500.0).cooldown("hunt", 10).apply(&mut p).unwrap();
        PlayerUpdate::new().cooldown("hunt", 20).apply(&mut p).unwrap();
        assert_eq!(p.hp, p.max_hp);
        assert_eq!(p.cooldowns.len(), 1);
        assert_eq!(p.cooldowns[0].expires_at_ms, 20);
        PlayerUpdate::new().hp(-3.0).apply(&mut p).unwrap();
        assert_eq!(p.hp, 0.0);
    }

    #[test]
    fn combatant_mirrors_record() {
        let mut p = PlayerRecord::new("amber");
        p.skills = vec![Skill::Leech];
        let c = p.combatant();
        assert_eq!(c.max_hp, 100.0);
        assert_eq!(c.min_damage, 10.0);
        assert!(c.has_skill(Skill::Leech));
        assert_eq!(p.entry_flags(), EntryFlags::default());
    }
}
