//! Encounter state machine.
//!
//! ```text
//! Idle --begin--> InCombat --advance--> Victory | Defeat | Fled
//! ```
//!
//! `advance` plays exactly one round. Pacing between rounds belongs to the
//! runner (see [`super::runner`]), so the machine itself has no timers and can
//! be stepped directly in tests.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::combat::{
    apply_attack, apply_status_effects, resolve_attack, AttackOutcome, Combatant,
    ExchangeContext, Side, StatusTick,
};
use super::loot::{merge_drops, resolve_monster_drops, DropResult};
use super::monsters::{MonsterDefinition, MonsterInstance};
use super::rng::RandomSource;
use crate::errors::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    Idle,
    InCombat,
    Victory,
    Defeat,
    /// Cancelled or ran out of turns. No loot, HP kept as-is.
    Fled,
}

impl EncounterState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EncounterState::Victory | EncounterState::Defeat | EncounterState::Fled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncounterKind {
    Hunt,
    Abyss { floor: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrder {
    MonsterFirst,
    PlayerFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterRules {
    pub turn_order: TurnOrder,
    /// Rounds before the player gives up and flees.
    pub max_turns: u32,
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self {
            turn_order: TurnOrder::MonsterFirst,
            max_turns: 200,
        }
    }
}

/// Player flags consulted before combat may start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub is_hunting: bool,
    pub is_travelling: bool,
}

/// What happened in one round, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub monster: String,
    pub monster_hp: f64,
    pub monster_max_hp: f64,
    pub player_hp: f64,
    pub player_max_hp: f64,
    pub monster_attack: Option<AttackOutcome>,
    pub player_attack: Option<AttackOutcome>,
    pub status: Vec<StatusTick>,
    /// Monster killed this round.
    pub defeated: Option<String>,
    /// Monster stepping up after a kill in a chained encounter.
    pub next_monster: Option<String>,
    pub state: EncounterState,
}

#[derive(Debug, Clone)]
struct ActiveMonster {
    instance: MonsterInstance,
    fighter: Combatant,
}

#[derive(Debug, Clone)]
pub struct Encounter {
    kind: EncounterKind,
    level: u32,
    state: EncounterState,
    rules: EncounterRules,
    player: Combatant,
    current: Option<ActiveMonster>,
    queue: VecDeque<MonsterInstance>,
    defeated: Vec<MonsterInstance>,
    ctx: ExchangeContext,
    turn: u32,
}

impl Encounter {
    pub fn new(
        kind: EncounterKind,
        level: u32,
        player: Combatant,
        monsters: Vec<MonsterInstance>,
        rules: EncounterRules,
    ) -> Self {
        Self {
            kind,
            level,
            state: EncounterState::Idle,
            rules,
            player,
            current: None,
            queue: monsters.into(),
            defeated: Vec::new(),
            ctx: ExchangeContext::default(),
            turn: 0,
        }
    }

    /// Move from `Idle` into combat, or stay `Idle` and report why not.
    pub fn begin(&mut self, flags: EntryFlags) -> Result<(), GameError> {
        if self.state != EncounterState::Idle {
            return Err(GameError::InvalidState(format!(
                "encounter already {:?}",
                self.state
            )));
        }
        if flags.is_hunting {
            return Err(GameError::AlreadyHunting);
        }
        if flags.is_travelling {
            return Err(GameError::Travelling);
        }
        if self.player.is_defeated() {
            return Err(GameError::NoHealth);
        }
        let Some(first) = self.queue.pop_front() else {
            return Err(GameError::NoMonsters { level: self.level });
        };
        log::debug!(
            "encounter start: player={} kind={:?} first={} queued={}",
            self.player.name,
            self.kind,
            first.name(),
            self.queue.len()
        );
        self.current = Some(ActiveMonster {
            fighter: Combatant::from_monster(&first),
            instance: first,
        });
        self.state = EncounterState::InCombat;
        Ok(())
    }

    /// Play one round. Returns `None` when not in combat.
    pub fn advance<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Option<TurnReport> {
        if self.state != EncounterState::InCombat {
            return None;
        }
        self.turn += 1;

        let order = match self.rules.turn_order {
            TurnOrder::MonsterFirst => [Side::Monster, Side::Player],
            TurnOrder::PlayerFirst => [Side::Player, Side::Monster],
        };

        let mut monster_attack = None;
        let mut player_attack = None;
        let mut status = Vec::new();
        let mut defeated = None;
        let mut next_monster = None;

        for side in order {
            let active = self.current.as_mut()?;
            match side {
                Side::Monster => {
                    let out = resolve_attack(
                        &active.fighter,
                        &self.player,
                        &mut ExchangeContext::default(),
                        rng,
                    );
                    apply_attack(&out, &mut active.fighter, &mut self.player);
                    monster_attack = Some(out);
                    status = apply_status_effects(&active.fighter, &mut self.player, rng);
                    if self.player.is_defeated() {
                        self.state = EncounterState::Defeat;
                        break;
                    }
                }
                Side::Player => {
                    let out = resolve_attack(&self.player, &active.fighter, &mut self.ctx, rng);
                    apply_attack(&out, &mut self.player, &mut active.fighter);
                    player_attack = Some(out);
                    if active.fighter.is_defeated() {
                        defeated = Some(active.fighter.name.clone());
                        next_monster = self.chain_next();
                        break;
                    }
                }
            }
        }

        if self.state == EncounterState::InCombat && self.turn >= self.rules.max_turns {
            log::info!(
                "encounter for {} hit the {} turn cap; fleeing",
                self.player.name,
                self.rules.max_turns
            );
            self.state = EncounterState::Fled;
        }

        let (monster, monster_hp, monster_max_hp) = match &self.current {
            Some(active) => (
                active.fighter.name.clone(),
                active.fighter.hp,
                active.fighter.max_hp,
            ),
            None => (defeated.clone().unwrap_or_default(), 0.0, 0.0),
        };

        Some(TurnReport {
            turn: self.turn,
            monster,
            monster_hp,
            monster_max_hp,
            player_hp: self.player.hp,
            player_max_hp: self.player.max_hp,
            monster_attack,
            player_attack,
            status,
            defeated,
            next_monster,
            state: self.state,
        })
    }

    /// Retire the dead monster and bring in the next one, or finish with a victory.
    fn chain_next(&mut self) -> Option<String> {
        if let Some(mut dead) = self.current.take() {
            dead.instance.hp = 0.0;
            self.defeated.push(dead.instance);
        }
        match self.queue.pop_front() {
            Some(next) => {
                let name = next.name().to_string();
                self.current = Some(ActiveMonster {
                    fighter: Combatant::from_monster(&next),
                    instance: next,
                });
                Some(name)
            }
            None => {
                self.state = EncounterState::Victory;
                None
            }
        }
    }

    /// Abort an ongoing fight. No-op unless in combat.
    pub fn flee(&mut self) {
        if self.state == EncounterState::InCombat {
            self.state = EncounterState::Fled;
        }
    }

    /// Drops for every monster killed, only after a victory.
    pub fn resolve_loot<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Vec<DropResult> {
        if self.state != EncounterState::Victory {
            return Vec::new();
        }
        merge_drops(
            self.defeated
                .iter()
                .flat_map(|m| resolve_monster_drops(m.definition, rng)),
        )
    }

    /// Coin bounty for the kills, paid only after a victory.
    pub fn coin_reward(&self) -> u64 {
        if self.state != EncounterState::Victory {
            return 0;
        }
        self.defeated
            .iter()
            .map(|m| (m.max_hp * 0.5).round() as u64 + self.level as u64 * 2)
            .sum()
    }

    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn kind(&self) -> EncounterKind {
        self.kind
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn player(&self) -> &Combatant {
        &self.player
    }

    pub fn defeated(&self) -> impl Iterator<Item = &'static MonsterDefinition> + '_ {
        self.defeated.iter().map(|m| m.definition)
    }

    /// Monsters still waiting, including the one currently fighting.
    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{abyss_floor, WORLD_MONSTERS};
    use crate::game::combat::Skill;
    use crate::game::rng::ScriptedRolls;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player(hp: f64, atk: f64) -> Combatant {
        Combatant::player("tester", hp, 100.0, atk, 0.0, 1.5, 0.0, 0.0, vec![])
    }

    fn slime(rng: &mut impl RandomSource) -> MonsterInstance {
        // Hydro Slime: no special element behavior
        WORLD_MONSTERS[0].spawn(1, rng).unwrap()
    }

    #[test]
    fn begin_preconditions() {
        let mut rng = ScriptedRolls::new([0.0]);
        let mut e = Encounter::new(EncounterKind::Hunt, 1, player(50.0, 10.0), vec![slime(&mut rng)], EncounterRules::default());
        let hunting = EntryFlags { is_hunting: true, is_travelling: false };
        assert!(matches!(e.begin(hunting), Err(GameError::AlreadyHunting)));
        let travel = EntryFlags { is_hunting: false, is_travelling: true };
        assert!(matches!(e.begin(travel), Err(GameError::Travelling)));
        assert_eq!(e.state(), EncounterState::Idle);

        let mut dead = Encounter::new(EncounterKind::Hunt, 1, player(0.0, 10.0), vec![slime(&mut rng)], EncounterRules::default());
        assert!(matches!(dead.begin(EntryFlags::default()), Err(GameError::NoHealth)));

        let mut empty = Encounter::new(EncounterKind::Hunt, 1, player(50.0, 10.0), vec![], EncounterRules::default());
        assert!(matches!(empty.begin(EntryFlags::default()), Err(GameError::NoMonsters { level: 1 })));
        assert_eq!(empty.state(), EncounterState::Idle);

        e.begin(EntryFlags::default()).unwrap();
        assert_eq!(e.state(), EncounterState::InCombat);
        assert!(e.begin(EntryFlags::default()).is_err());
    }

    #[test]
    fn idle_encounter_does_not_advance() {
        let mut rng = ScriptedRolls::new([]);
        let mut e = Encounter::new(EncounterKind::Hunt, 1, player(50.0, 10.0), vec![], EncounterRules::default());
        assert!(e.advance(&mut rng).is_none());
    }

    #[test]
    fn one_shot_victory_with_loot() {
        let mut rng = ScriptedRolls::new([0.0]).with_fallback(0.9);
        let monster = slime(&mut rng); // 9 HP
        let rules = EncounterRules { turn_order: TurnOrder::PlayerFirst, max_turns: 10 };
        let mut e = Encounter::new(EncounterKind::Hunt, 1, player(50.0, 20.0), vec![monster], rules);
        e.begin(EntryFlags::default()).unwrap();
        let report = e.advance(&mut rng).unwrap();
        assert_eq!(report.state, EncounterState::Victory);
        assert_eq!(report.defeated.as_deref(), Some("Hydro Slime"));
        assert!(report.monster_attack.is_none());
        assert!(e.coin_reward() > 0);
        let mut lucky = ScriptedRolls::new([]).with_fallback(0.0);
        assert!(!e.resolve_loot(&mut lucky).is_empty());
        assert!(e.advance(&mut rng).is_none());
    }

    #[test]
    fn defeat_grants_nothing() {
        let mut rng = ScriptedRolls::new([0.0]).with_fallback(0.5);
        let monster = slime(&mut rng);
        let mut e = Encounter::new(EncounterKind::Hunt, 1, player(1.0, 1.0), vec![monster], EncounterRules::default());
        e.begin(EntryFlags::default()).unwrap();
        let report = e.advance(&mut rng).unwrap();
        assert_eq!(report.state, EncounterState::Defeat);
        assert_eq!(report.player_hp, 0.0);
        assert!(report.player_attack.is_none());
        assert_eq!(e.coin_reward(), 0);
        assert!(e.resolve_loot(&mut rng).is_empty());
    }

    #[test]
    fn chained_monsters_fight_in_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let floor = abyss_floor(1).unwrap();
        let monsters: Vec<_> = floor
            .monsters
            .iter()
            .map(|m| m.spawn(floor.level as i64, &mut rng).unwrap())
            .collect();
        let count = monsters.len();
        let mut hero = Combatant::player("hero", 1e9, 1e9, 1e7, 0.0, 1.5, 0.0, 0.0, vec![Skill::Kindle]);
        hero.def_value = 0.0;
        let rules = EncounterRules { turn_order: TurnOrder::PlayerFirst, max_turns: 50 };
        let mut e = Encounter::new(EncounterKind::Abyss { floor: 1 }, floor.level, hero, monsters, rules);
        e.begin(EntryFlags::default()).unwrap();
        let mut kills = Vec::new();
        while let Some(r) = e.advance(&mut rng) {
            if let Some(name) = r.defeated {
                kills.push(name);
            }
        }
        assert_eq!(e.state(), EncounterState::Victory);
        assert_eq!(kills.len(), count);
        assert_eq!(e.defeated().count(), count);
        assert_eq!(e.remaining(), 0);
    }

    #[test]
    fn turn_cap_flees() {
        let mut rng = ScriptedRolls::new([0.0]).with_fallback(0.99);
        let monster = slime(&mut rng);
        // zero attack on both sides would stall forever
        let mut e = Encounter::new(
            EncounterKind::Hunt,
            1,
            player(100.0, 0.0),
            vec![monster],
            EncounterRules { turn_order: TurnOrder::MonsterFirst, max_turns: 3 },
        );
        e.begin(EntryFlags::default()).unwrap();
        let mut last = None;
        while let Some(r) = e.advance(&mut rng) {
            last = Some(r);
        }
        assert_eq!(last.unwrap().state, EncounterState::Fled);
        assert_eq!(e.turn(), 3);
    }

    #[test]
    fn flee_only_from_combat() {
        let mut rng = ScriptedRolls::new([0.0]);
        let mut e = Encounter::new(EncounterKind::Hunt, 1, player(50.0, 1.0), vec![slime(&mut rng)], EncounterRules::default());
        e.flee();
        assert_eq!(e.state(), EncounterState::Idle);
        e.begin(EntryFlags::default()).unwrap();
        e.flee();
        assert_eq!(e.state(), EncounterState::Fled);
        assert!(e.is_finished());
    }
}
