//! Economy action coordinator.
//!
//! Every player-facing action runs the same sequence: take the player's lease,
//! check preconditions and the action's cooldown, mutate, persist, and release.
//! Precondition failures return before anything is written.
//!
//! Cooldown and balance changes are separate store writes. A crash between
//! them can leave a cooldown set without the matching coins credited; the
//! wallet log records every credit that did land.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::GameError;
use crate::game::catalog::{abyss_floor, world_pool};
use crate::game::dungeon::{self, attempt_move, Direction, MoveResult, Position};
use crate::game::encounter::{Encounter, EncounterKind, EncounterRules, EncounterState};
use crate::game::loot::{resolve_chest, resolve_gather, ChestLoot, DropResult};
use crate::game::rng::RandomSource;
use crate::storage::{PlayerRecord, PlayerStore, PlayerUpdate, WalletStore};

use super::clock::Clock;
use super::cooldown::{check_cooldown, format_wait, Action, CooldownStatus};
use super::crafting::{find_recipe, food_heal_ratio};
use super::expedition::{self, ExpeditionClaim};
use super::lease::{LeaseGuard, LeaseStore};
use super::prize_pool::PrizePool;

pub const MAX_WORLD_LEVEL: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownDurations {
    pub hunt: Duration,
    pub abyss: Duration,
    pub explore: Duration,
    pub gather: Duration,
    pub craft: Duration,
    pub cook: Duration,
    pub expedition: Duration,
}

impl CooldownDurations {
    pub fn get(&self, action: Action) -> Duration {
        match action {
            Action::Hunt => self.hunt,
            Action::Abyss => self.abyss,
            Action::Explore => self.explore,
            Action::Gather => self.gather,
            Action::Craft => self.craft,
            Action::Cook => self.cook,
            Action::Expedition => self.expedition,
        }
    }
}

impl Default for CooldownDurations {
    fn default() -> Self {
        Self {
            hunt: Duration::from_secs(60),
            abyss: Duration::from_secs(300),
            explore: Duration::from_secs(600),
            gather: Duration::from_secs(120),
            craft: Duration::from_secs(30),
            cook: Duration::from_secs(30),
            expedition: Duration::from_secs(60),
        }
    }
}

/// Stats a brand new player starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartingStats {
    pub balance: u64,
    pub hp: f64,
    pub attack: f64,
}

impl Default for StartingStats {
    fn default() -> Self {
        Self {
            balance: 500,
            hp: 100.0,
            attack: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EconomySettings {
    pub cooldowns: CooldownDurations,
    pub lease_ttl: Duration,
    pub rules: EncounterRules,
    pub abyss_entry_fee: u64,
    pub starting: StartingStats,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            cooldowns: CooldownDurations::default(),
            lease_ttl: Duration::from_secs(60),
            rules: EncounterRules::default(),
            abyss_entry_fee: 50,
            starting: StartingStats::default(),
        }
    }
}

/// Clears the player's hunting flag if dropped before the encounter's outcome
/// is recorded, so a panicked or abandoned fight never leaves the player stuck.
pub struct HuntGuard<S: PlayerStore> {
    store: Arc<S>,
    user_id: String,
    armed: bool,
}

impl<S: PlayerStore> std::fmt::Debug for HuntGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuntGuard")
            .field("user_id", &self.user_id)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl<S: PlayerStore> HuntGuard<S> {
    fn new(store: Arc<S>, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            armed: true,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<S: PlayerStore> Drop for HuntGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self
            .store
            .update_player(&self.user_id, &PlayerUpdate::new().hunting(false))
        {
            Ok(_) => log::warn!(
                "encounter for {} ended without a result; hunting flag cleared",
                self.user_id
            ),
            Err(e) => log::error!(
                "failed to clear hunting flag for {}: {}",
                self.user_id,
                e
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncounterSummary {
    pub state: EncounterState,
    pub turns: u32,
    pub hp: f64,
    pub coins: u64,
    pub items: Vec<DropResult>,
    /// Abyss floor cleared by this encounter.
    pub floor_cleared: Option<u32>,
    /// Prize pool payout for clearing a boss floor.
    pub prize: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DungeonMove {
    pub result: MoveResult,
    pub picked_up_key: bool,
    pub chest: Option<ChestLoot>,
    /// Stored position that was invalid and got reset to the entrance before moving.
    pub reset_from: Option<Position>,
}

pub struct EconomyCoordinator<S, L, C> {
    store: Arc<S>,
    leases: L,
    clock: C,
    pool: Arc<PrizePool>,
    settings: EconomySettings,
}

impl<S, L, C> EconomyCoordinator<S, L, C>
where
    S: PlayerStore + WalletStore,
    L: LeaseStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        leases: L,
        clock: C,
        pool: Arc<PrizePool>,
        settings: EconomySettings,
    ) -> Self {
        Self {
            store,
            leases,
            clock,
            pool,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<PrizePool> {
        &self.pool
    }

    pub fn settings(&self) -> &EconomySettings {
        &self.settings
    }

    fn lease(&self, user_id: &str) -> Result<LeaseGuard<'_, L>, GameError> {
        let key = format!("player:{}", user_id.to_ascii_lowercase());
        LeaseGuard::try_acquire(&self.leases, &key, self.settings.lease_ttl).ok_or_else(|| {
            log::info!("{} is busy with another action", user_id);
            GameError::Busy(user_id.to_string())
        })
    }

    /// Current time if `action` is off cooldown for `player`.
    fn require_ready(&self, player: &PlayerRecord, action: Action) -> Result<i64, GameError> {
        let now = self.clock.now_ms();
        let status = check_cooldown(&player.cooldowns, action.key(), now);
        if let CooldownStatus::Waiting { remaining_ms, .. } = status {
            log::debug!(
                "{} rejected for {}: {} remaining",
                action,
                player.user_id,
                format_wait(remaining_ms)
            );
        }
        status.require_ready(action.key())?;
        Ok(now)
    }

    fn expiry(&self, action: Action, now_ms: i64) -> i64 {
        let ms = i64::try_from(self.settings.cooldowns.get(action).as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_add(ms)
    }

    fn credit(&self, user_id: &str, coins: u64, reason: &str) -> Result<(), GameError> {
        if coins == 0 {
            return Ok(());
        }
        let balance = self.store.add_balance(user_id, coins, true, reason)?;
        log::info!(target: "economy", "{} +{} coins ({}), balance {}", user_id, coins, reason, balance);
        Ok(())
    }

    /// Undo an Abyss entry charge after the entry itself failed to persist.
    async fn refund_entry_fee(&self, user_id: &str, fee: u64) {
        if let Err(e) = self.pool.reclaim(fee).await {
            log::error!(target: "economy", "could not take {} back from the prize pool for {}: {}", fee, user_id, e);
        }
        match self.store.add_balance(user_id, fee, true, "abyss entry refund") {
            Ok(balance) => log::info!(target: "economy", "{} refunded {} (entry failed), balance {}", user_id, fee, balance),
            Err(e) => log::error!(target: "economy", "abyss entry refund of {} for {} failed: {}", fee, user_id, e),
        }
    }

    /// Load a player, creating them with the configured starting stats on first sight.
    pub fn register(&self, user_id: &str) -> Result<PlayerRecord, GameError> {
        match self.store.get_player(user_id) {
            Ok(p) => Ok(p),
            Err(GameError::NotFound(_)) => {
                let start = self.settings.starting;
                let mut record = PlayerRecord::new(user_id);
                record.hp = start.hp;
                record.max_hp = start.hp;
                record.attack_power = start.attack;
                record.balance = start.balance;
                self.store.put_player(record.clone())?;
                log::info!("registered new player {}", user_id);
                Ok(record)
            }
            Err(e) => Err(e),
        }
    }

    pub fn cooldown_status(&self, user_id: &str, action: Action) -> Result<CooldownStatus, GameError> {
        let player = self.store.get_player(user_id)?;
        Ok(check_cooldown(&player.cooldowns, action.key(), self.clock.now_ms()))
    }

    // ------------------------------------------------------------------
    // Encounters
    // ------------------------------------------------------------------

    /// Start an overworld hunt against one random monster for the player's level.
    pub fn begin_hunt<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<(Encounter, HuntGuard<S>), GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        let now = self.require_ready(&player, Action::Hunt)?;

        let level = player.level;
        let pool = world_pool(level as i64);
        let monsters = if pool.is_empty() {
            Vec::new()
        } else {
            let def = pool[rng.pick_index(pool.len())];
            def.spawn(level as i64, rng).into_iter().collect()
        };
        let mut encounter = Encounter::new(
            EncounterKind::Hunt,
            level,
            player.combatant(),
            monsters,
            self.settings.rules,
        );
        encounter.begin(player.entry_flags())?;

        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .hunting(true)
                .cooldown(Action::Hunt.key(), self.expiry(Action::Hunt, now)),
        )?;
        log::info!("{} started a hunt at level {}", user_id, level);
        Ok((encounter, HuntGuard::new(Arc::clone(&self.store), user_id)))
    }

    /// Challenge the next Abyss floor. Charges the entry fee into the prize pool.
    pub async fn begin_abyss<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<(Encounter, HuntGuard<S>), GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        let now = self.require_ready(&player, Action::Abyss)?;

        let floor_no = player.abyss_floor + 1;
        let floor = abyss_floor(floor_no).ok_or_else(|| {
            GameError::InvalidState(format!("the Abyss has no floor {}", floor_no))
        })?;
        let monsters = floor
            .monsters
            .iter()
            .copied()
            .filter_map(|m| m.spawn(floor.level as i64, rng))
            .collect();
        let mut encounter = Encounter::new(
            EncounterKind::Abyss { floor: floor_no },
            floor.level,
            player.combatant(),
            monsters,
            self.settings.rules,
        );
        encounter.begin(player.entry_flags())?;

        let fee = self.settings.abyss_entry_fee;
        if player.balance < fee {
            return Err(GameError::InsufficientFunds);
        }
        if fee > 0 {
            self.store.remove_balance(user_id, fee, true, "abyss entry fee")?;
            if let Err(e) = self.pool.contribute(fee).await {
                self.store.add_balance(user_id, fee, true, "abyss entry refund")?;
                return Err(e);
            }
        }

        let entered = self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .hunting(true)
                .cooldown(Action::Abyss.key(), self.expiry(Action::Abyss, now)),
        );
        if let Err(e) = entered {
            if fee > 0 {
                self.refund_entry_fee(user_id, fee).await;
            }
            return Err(e);
        }
        log::info!("{} entered Abyss floor {} (level {})", user_id, floor_no, floor.level);
        Ok((encounter, HuntGuard::new(Arc::clone(&self.store), user_id)))
    }

    /// Persist a finished encounter: HP, loot, coins, floor progress, and the
    /// prize pool for boss floors. Always clears the hunting flag.
    ///
    /// A boss floor whose prize pool cannot be paid out keeps the loot and
    /// bounty but is not marked cleared, and the pool error is returned.
    pub async fn finish_encounter<R: RandomSource + ?Sized>(
        &self,
        mut guard: HuntGuard<S>,
        encounter: &Encounter,
        rng: &mut R,
    ) -> Result<EncounterSummary, GameError> {
        let state = encounter.state();
        if !state.is_terminal() {
            return Err(GameError::InvalidState(format!(
                "encounter has not ended ({:?})",
                state
            )));
        }
        let user_id = guard.user_id().to_string();
        let victory = state == EncounterState::Victory;
        let items = encounter.resolve_loot(rng);
        let coins = encounter.coin_reward();
        let hp = encounter.player().hp;

        // The prize is taken before the floor is recorded so a pool failure
        // leaves the boss floor open to be cleared again.
        let boss_floor = match encounter.kind() {
            EncounterKind::Abyss { floor } if victory => {
                abyss_floor(floor).is_some_and(|f| f.is_boss_floor())
            }
            _ => false,
        };
        let mut prize = None;
        let mut payout_error = None;
        if boss_floor {
            match self.pool.payout_and_reset(&user_id).await {
                Ok(payout) => prize = Some(payout),
                Err(e) => {
                    log::warn!(target: "economy", "prize pool payout for {} failed: {}; floor left open", user_id, e);
                    payout_error = Some(e);
                }
            }
        }

        let mut update = PlayerUpdate::new()
            .hunting(false)
            .hp(hp)
            .add_items(items.clone());
        let floor_cleared = match encounter.kind() {
            EncounterKind::Abyss { floor } if victory && payout_error.is_none() => {
                update = update.abyss_floor(floor);
                Some(floor)
            }
            _ => None,
        };
        if let Err(e) = self.store.update_player(&user_id, &update) {
            if let Some(payout) = prize {
                if let Err(pool_err) = self.pool.restore_payout(payout).await {
                    log::error!(target: "economy", "prize of {} for {} could not be returned to the pool: {}", payout, user_id, pool_err);
                }
            }
            return Err(e);
        }
        guard.disarm();
        log::info!(
            "encounter for {} ended {:?} after {} turns ({} items, {} coins)",
            user_id,
            state,
            encounter.turn(),
            items.len(),
            coins
        );

        self.credit(&user_id, coins, "encounter bounty")?;
        if let Some(payout) = prize {
            self.credit(&user_id, payout, "abyss prize pool")?;
        }
        if let Some(e) = payout_error {
            return Err(e);
        }

        Ok(EncounterSummary {
            state,
            turns: encounter.turn(),
            hp,
            coins,
            items,
            floor_cleared,
            prize,
        })
    }

    // ------------------------------------------------------------------
    // Timed actions
    // ------------------------------------------------------------------

    /// Open a chest in the overworld.
    pub fn explore<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<ChestLoot, GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        if player.is_travelling {
            return Err(GameError::Travelling);
        }
        let now = self.require_ready(&player, Action::Explore)?;

        let chest = resolve_chest(player.level, rng);
        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .add_items(chest.items.clone())
                .cooldown(Action::Explore.key(), self.expiry(Action::Explore, now)),
        )?;
        self.credit(user_id, chest.coins, "chest")?;
        log::info!(
            "{} opened a {} chest: {} items, {} coins",
            user_id,
            chest.rarity.label(),
            chest.items.len(),
            chest.coins
        );
        Ok(chest)
    }

    /// Gather one material haul. `None` when nothing grows at the player's level.
    pub fn gather<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<Option<DropResult>, GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        if player.is_travelling {
            return Err(GameError::Travelling);
        }
        let now = self.require_ready(&player, Action::Gather)?;

        let haul = resolve_gather(player.level, rng);
        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .add_items(haul.clone())
                .cooldown(Action::Gather.key(), self.expiry(Action::Gather, now)),
        )?;
        if let Some(h) = &haul {
            log::info!("{} gathered {} x{}", user_id, h.item, h.quantity);
        }
        Ok(haul)
    }

    /// Craft or cook `recipe`. The cooldown charged depends on the recipe's station.
    pub fn craft(&self, user_id: &str, recipe: &str) -> Result<DropResult, GameError> {
        let _lease = self.lease(user_id)?;
        let recipe = find_recipe(recipe).ok_or_else(|| GameError::UnknownRecipe(recipe.to_string()))?;
        let player = self.store.get_player(user_id)?;
        let action = recipe.station.action();
        let now = self.require_ready(&player, action)?;

        let inputs = recipe.inputs();
        let missing: Vec<String> = inputs
            .iter()
            .filter_map(|need| {
                let have = player.item_amount(&need.item);
                (have < need.quantity).then(|| format!("{} x{}", need.item, need.quantity - have))
            })
            .collect();
        if !missing.is_empty() {
            return Err(GameError::MissingMaterials(missing.join(", ")));
        }

        let output = recipe.output();
        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .remove_items(inputs)
                .add_items([output.clone()])
                .cooldown(action.key(), self.expiry(action, now)),
        )?;
        log::info!("{} made {} x{} ({})", user_id, output.item, output.quantity, action);
        Ok(output)
    }

    /// Eat one food item. Returns HP restored.
    pub fn eat(&self, user_id: &str, item: &str) -> Result<f64, GameError> {
        let _lease = self.lease(user_id)?;
        let ratio = food_heal_ratio(item)
            .ok_or_else(|| GameError::InvalidState(format!("{} is not edible", item)))?;
        let player = self.store.get_player(user_id)?;
        if player.is_hunting {
            return Err(GameError::AlreadyHunting);
        }
        if player.item_amount(item) == 0 {
            return Err(GameError::MissingMaterials(format!("{} x1", item)));
        }
        let healed = (player.max_hp * ratio).min(player.max_hp - player.hp).max(0.0);
        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .remove_items([DropResult::new(item, 1)])
                .hp(player.hp + healed),
        )?;
        log::debug!("{} ate {} and restored {:.2} HP", user_id, item, healed);
        Ok(healed)
    }

    /// Move the world level one step up or down, within `1..=MAX_WORLD_LEVEL`.
    pub fn change_level(&self, user_id: &str, upgrade: bool) -> Result<u32, GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        if player.is_hunting {
            return Err(GameError::AlreadyHunting);
        }
        let next = if upgrade {
            (player.level + 1).min(MAX_WORLD_LEVEL)
        } else {
            player.level.saturating_sub(1).max(1)
        };
        if next == player.level {
            return Err(GameError::InvalidState(format!(
                "world level is already {}",
                player.level
            )));
        }
        self.store.update_player(user_id, &PlayerUpdate::new().level(next))?;
        log::info!("{} world level {} -> {}", user_id, player.level, next);
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Expeditions
    // ------------------------------------------------------------------

    pub fn start_expedition(
        &self,
        user_id: &str,
        destination: &str,
    ) -> Result<expedition::ActiveExpedition, GameError> {
        let _lease = self.lease(user_id)?;
        let dest = expedition::find_destination(destination).ok_or_else(|| {
            GameError::InvalidState(format!("unknown destination {}", destination))
        })?;
        let player = self.store.get_player(user_id)?;
        if player.is_hunting {
            return Err(GameError::AlreadyHunting);
        }
        if player.is_travelling || player.expedition.is_some() {
            return Err(GameError::Travelling);
        }
        let now = self.require_ready(&player, Action::Expedition)?;

        let record = expedition::plan(dest, now);
        let active = expedition::validate(&record)
            .ok_or_else(|| GameError::Internal("planned expedition failed validation".into()))?;
        self.store.update_player(
            user_id,
            &PlayerUpdate::new().travelling(true).expedition(Some(record)),
        )?;
        log::info!("{} left for {} until {}", user_id, dest.name, active.ends_at_ms);
        Ok(active)
    }

    /// Collect a finished expedition. Damaged expedition data is reset, never fatal.
    pub fn claim_expedition<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<ExpeditionClaim, GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        let now = self.clock.now_ms();

        let Some(record) = &player.expedition else {
            if player.is_travelling {
                log::warn!("{} was travelling with no expedition; resetting", user_id);
                self.store
                    .update_player(user_id, &PlayerUpdate::new().travelling(false))?;
                return Ok(ExpeditionClaim::CorruptedReset);
            }
            return Err(GameError::InvalidState("no expedition in progress".into()));
        };

        let Some(active) = expedition::validate(record) else {
            log::warn!("corrupted expedition for {}: {:?}; resetting", user_id, record);
            self.store.update_player(
                user_id,
                &PlayerUpdate::new().travelling(false).expedition(None),
            )?;
            return Ok(ExpeditionClaim::CorruptedReset);
        };

        if !active.is_complete(now) {
            return Ok(ExpeditionClaim::NotReady {
                destination: active.destination.name,
                ends_at_ms: active.ends_at_ms,
            });
        }

        let (coins, items) = expedition::roll_rewards(active.destination, player.level, rng);
        self.store.update_player(
            user_id,
            &PlayerUpdate::new()
                .travelling(false)
                .expedition(None)
                .add_items(items.clone())
                .cooldown(Action::Expedition.key(), self.expiry(Action::Expedition, now)),
        )?;
        self.credit(user_id, coins, "expedition reward")?;
        Ok(ExpeditionClaim::Completed {
            destination: active.destination.name,
            coins,
            items,
        })
    }

    // ------------------------------------------------------------------
    // Dungeon
    // ------------------------------------------------------------------

    /// Where the player stands, plus the stored position it replaced when that
    /// one was off the map or inside a wall. A replaced position is reset to the
    /// entrance and persisted immediately.
    fn checked_position(
        &self,
        player: &PlayerRecord,
    ) -> Result<(Position, Option<Position>), GameError> {
        let entrance =
            || dungeon::entrance().ok_or_else(|| GameError::Internal("no dungeon floors are defined".into()));
        let Some(pos) = player.position else {
            return Ok((entrance()?, None));
        };
        let valid = dungeon::floor(pos.floor).is_some_and(|grid| grid.is_traversable(pos.x, pos.y));
        if valid {
            return Ok((pos, None));
        }
        let start = entrance()?;
        log::warn!(
            "corrupted dungeon position for {}: {:?}; resetting to {:?}",
            player.user_id,
            pos,
            start
        );
        self.store
            .update_player(&player.user_id, &PlayerUpdate::new().position(start))?;
        Ok((start, Some(pos)))
    }

    /// Player's dungeon position, or the entrance if they have never entered.
    /// An invalid stored position is reset to the entrance.
    pub fn dungeon_position(&self, user_id: &str) -> Result<Position, GameError> {
        let player = self.store.get_player(user_id)?;
        Ok(self.checked_position(&player)?.0)
    }

    pub fn dungeon_move<R: RandomSource + ?Sized>(
        &self,
        user_id: &str,
        direction: Direction,
        rng: &mut R,
    ) -> Result<DungeonMove, GameError> {
        let _lease = self.lease(user_id)?;
        let player = self.store.get_player(user_id)?;
        if player.is_hunting {
            return Err(GameError::AlreadyHunting);
        }
        if player.is_travelling {
            return Err(GameError::Travelling);
        }
        let (pos, reset_from) = self.checked_position(&player)?;
        let grid = dungeon::floor(pos.floor)
            .ok_or_else(|| GameError::Internal(format!("dungeon floor {} is missing", pos.floor)))?;
        let result = attempt_move(pos, direction, grid, &player.dungeon)
            .map_err(|r| GameError::Blocked(r.message().to_string()))?;

        let mut progress = player.dungeon.clone();
        let mut picked_up_key = false;
        let mut chest = None;
        match result.effect {
            dungeon::CellEffect::Key { already_held: false } => {
                progress.has_key = true;
                picked_up_key = true;
            }
            dungeon::CellEffect::Chest {
                at,
                already_collected: false,
            } => {
                progress.collected_chests.insert(at);
                chest = Some(resolve_chest(player.level, rng));
            }
            _ => {}
        }

        let mut update = PlayerUpdate::new()
            .position(result.position)
            .dungeon(progress);
        if let Some(c) = &chest {
            update = update.add_items(c.items.clone());
        }
        self.store.update_player(user_id, &update)?;
        if let Some(c) = &chest {
            self.credit(user_id, c.coins, "dungeon chest")?;
        }
        log::debug!("{} moved {:?} to {:?}", user_id, direction, result.position);
        Ok(DungeonMove {
            result,
            picked_up_key,
            chest,
            reset_from,
        })
    }
}
