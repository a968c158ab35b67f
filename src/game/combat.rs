//! Single-exchange combat resolution.
//!
//! [`resolve_attack`] computes what one swing does without touching either
//! combatant; [`apply_attack`] commits the outcome with HP clamped to
//! `[0, max_hp]`. Monster status effects tick separately once per monster turn
//! via [`apply_status_effects`], whether or not the monster's swing landed.
//!
//! Roll order for one swing:
//! 1. base damage (rolled only when the damage range is wider than a point)
//! 2. crit
//! 3. stun (player attacking an Electro monster, 25%), ends the swing
//! 4. dodge (player attacking an Anemo monster, 25%), ends the swing
//! 5. defense
//! 6. Leech (50%) when the attacker has it

use serde::{Deserialize, Serialize};

use super::monsters::{Element, MonsterInstance};
use super::rng::RandomSource;

pub const STUN_CHANCE: f64 = 25.0;
pub const DODGE_CHANCE: f64 = 25.0;
pub const LEECH_CHANCE: f64 = 50.0;
pub const LEECH_RATIO: f64 = 0.05;
pub const KINDLE_RATIO: f64 = 0.10;
pub const VIGILANCE_RATIO: f64 = 0.5;
pub const BURN_RATIO: f64 = 0.03;
pub const CRIPPLE_CHANCE: f64 = 5.0;
pub const CRIPPLE_RATIO: f64 = 0.10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Once per encounter, the first landed hit strikes again for half damage.
    Vigilance,
    /// Half the time, heal for 5% of the target's max HP.
    Leech,
    /// Every hit deals bonus damage equal to 10% of own max HP.
    Kindle,
}

impl Skill {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vigilance" => Some(Skill::Vigilance),
            "leech" => Some(Skill::Leech),
            "kindle" => Some(Skill::Kindle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Monster,
}

/// Stats one fighter brings into an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub name: String,
    pub side: Side,
    pub hp: f64,
    pub max_hp: f64,
    pub min_damage: f64,
    pub max_damage: f64,
    pub crit_chance: f64,
    pub crit_value: f64,
    pub def_chance: f64,
    pub def_value: f64,
    pub element: Option<Element>,
    pub skills: Vec<Skill>,
}

impl Combatant {
    #[allow(clippy::too_many_arguments)]
    pub fn player(
        name: impl Into<String>,
        hp: f64,
        max_hp: f64,
        attack_power: f64,
        crit_chance: f64,
        crit_value: f64,
        def_chance: f64,
        def_value: f64,
        skills: Vec<Skill>,
    ) -> Self {
        let max_hp = max_hp.max(1.0);
        Self {
            name: name.into(),
            side: Side::Player,
            hp: hp.clamp(0.0, max_hp),
            max_hp,
            min_damage: attack_power,
            max_damage: attack_power,
            crit_chance,
            crit_value,
            def_chance,
            def_value,
            element: None,
            skills,
        }
    }

    pub fn from_monster(monster: &MonsterInstance) -> Self {
        let def = monster.definition;
        Self {
            name: def.name.to_string(),
            side: Side::Monster,
            hp: monster.hp,
            max_hp: monster.max_hp,
            min_damage: monster.stats.min_damage,
            max_damage: monster.stats.max_damage,
            crit_chance: def.crit_chance,
            crit_value: def.crit_value,
            def_chance: def.def_chance,
            def_value: def.def_value,
            element: Some(def.element),
            skills: Vec::new(),
        }
    }

    pub fn has_skill(&self, skill: Skill) -> bool {
        self.skills.contains(&skill)
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0.0
    }

    /// Subtract damage, clamping at 0. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0.0)).clamp(0.0, self.max_hp);
        before - self.hp
    }

    /// Restore HP, clamping at max. Returns the HP actually gained.
    pub fn heal(&mut self, amount: f64) -> f64 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).clamp(0.0, self.max_hp);
        self.hp - before
    }

    fn roll_damage<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_damage <= self.min_damage {
            return self.min_damage.max(0.0);
        }
        let span = self.max_damage - self.min_damage;
        (self.min_damage + (rng.next_f64() * (span + 1.0)).floor()).min(self.max_damage)
    }
}

/// Per-encounter state the resolver needs between swings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeContext {
    pub vigilance_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Narrative {
    Stunned,
    Dodged,
    Vigilance { bonus: f64 },
    Leech { healed: f64 },
    Kindle { bonus: f64 },
}

/// Result of one swing, before it is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub damage: f64,
    pub was_crit: bool,
    pub was_defended: bool,
    /// HP the attacker regains (Leech).
    pub heal: f64,
    pub flags: Vec<Narrative>,
}

impl AttackOutcome {
    fn negated(was_crit: bool, flag: Narrative) -> Self {
        Self {
            damage: 0.0,
            was_crit,
            was_defended: false,
            heal: 0.0,
            flags: vec![flag],
        }
    }

    pub fn has(&self, flag: &Narrative) -> bool {
        self.flags
            .iter()
            .any(|f| std::mem::discriminant(f) == std::mem::discriminant(flag))
    }
}

/// Resolve one swing from `attacker` at `defender`.
pub fn resolve_attack<R: RandomSource + ?Sized>(
    attacker: &Combatant,
    defender: &Combatant,
    ctx: &mut ExchangeContext,
    rng: &mut R,
) -> AttackOutcome {
    let mut damage = attacker.roll_damage(rng);

    let was_crit = rng.chance(attacker.crit_chance);
    if was_crit {
        damage *= attacker.crit_value;
    }

    if attacker.side == Side::Player {
        match defender.element {
            Some(Element::Electro) if rng.chance(STUN_CHANCE) => {
                return AttackOutcome::negated(was_crit, Narrative::Stunned);
            }
            Some(Element::Anemo) if rng.chance(DODGE_CHANCE) => {
                return AttackOutcome::negated(was_crit, Narrative::Dodged);
            }
            _ => {}
        }
    }

    let was_defended = rng.chance(defender.def_chance);
    if was_defended {
        damage = (damage - defender.def_value).max(0.0);
    }

    let mut flags = Vec::new();
    let mut heal = 0.0;

    if attacker.has_skill(Skill::Kindle) {
        let bonus = attacker.max_hp * KINDLE_RATIO;
        damage += bonus;
        flags.push(Narrative::Kindle { bonus });
    }
    if attacker.has_skill(Skill::Vigilance) && !ctx.vigilance_used && damage > 0.0 {
        let bonus = damage * VIGILANCE_RATIO;
        damage += bonus;
        ctx.vigilance_used = true;
        flags.push(Narrative::Vigilance { bonus });
    }
    if attacker.has_skill(Skill::Leech) && rng.chance(LEECH_CHANCE) {
        heal = defender.max_hp * LEECH_RATIO;
        flags.push(Narrative::Leech { healed: heal });
    }

    AttackOutcome {
        damage: damage.max(0.0),
        was_crit,
        was_defended,
        heal,
        flags,
    }
}

/// Commit an outcome. Returns the HP the defender actually lost.
pub fn apply_attack(
    outcome: &AttackOutcome,
    attacker: &mut Combatant,
    defender: &mut Combatant,
) -> f64 {
    let dealt = defender.take_damage(outcome.damage);
    if outcome.heal > 0.0 {
        attacker.heal(outcome.heal);
    }
    dealt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Burn,
    Cripple,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusTick {
    pub kind: StatusKind,
    pub damage: f64,
}

/// Element-driven effects a monster inflicts on the player each monster turn.
pub fn apply_status_effects<R: RandomSource + ?Sized>(
    monster: &Combatant,
    player: &mut Combatant,
    rng: &mut R,
) -> Vec<StatusTick> {
    let mut ticks = Vec::new();
    match monster.element {
        Some(Element::Pyro) => {
            let damage = player.take_damage(player.max_hp * BURN_RATIO);
            ticks.push(StatusTick {
                kind: StatusKind::Burn,
                damage,
            });
        }
        Some(Element::Cryo) if rng.chance(CRIPPLE_CHANCE) => {
            let damage = player.take_damage(player.max_hp * CRIPPLE_RATIO);
            ticks.push(StatusTick {
                kind: StatusKind::Cripple,
                damage,
            });
        }
        _ => {}
    }
    ticks
}

/// Damage as shown to players.
pub fn format_damage(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rng::ScriptedRolls;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hero(skills: Vec<Skill>) -> Combatant {
        Combatant::player("hero", 100.0, 100.0, 20.0, 10.0, 2.0, 10.0, 5.0, skills)
    }

    fn foe(element: Element) -> Combatant {
        Combatant {
            name: "foe".into(),
            side: Side::Monster,
            hp: 50.0,
            max_hp: 50.0,
            min_damage: 4.0,
            max_damage: 6.0,
            crit_chance: 10.0,
            crit_value: 1.5,
            def_chance: 20.0,
            def_value: 8.0,
            element: Some(element),
            skills: Vec::new(),
        }
    }

    #[test]
    fn plain_hit_without_crit_or_defense() {
        // crit roll 0.5 (50 >= 10), defense roll 0.5 (50 >= 20)
        let mut rng = ScriptedRolls::new([0.5, 0.5]);
        let out = resolve_attack(&hero(vec![]), &foe(Element::Hydro), &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 20.0);
        assert!(!out.was_crit && !out.was_defended);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn crit_then_defense() {
        let mut rng = ScriptedRolls::new([0.05, 0.1]);
        let out = resolve_attack(&hero(vec![]), &foe(Element::Hydro), &mut Default::default(), &mut rng);
        assert!(out.was_crit && out.was_defended);
        assert_eq!(out.damage, 32.0);
    }

    #[test]
    fn defense_floors_at_zero() {
        let mut weak = hero(vec![]);
        weak.min_damage = 3.0;
        weak.max_damage = 3.0;
        let mut rng = ScriptedRolls::new([0.9, 0.0]);
        let out = resolve_attack(&weak, &foe(Element::Geo), &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 0.0);
    }

    #[test]
    fn electro_stun_short_circuits() {
        // crit miss, stun hit; no defense roll consumed
        let mut rng = ScriptedRolls::new([0.9, 0.1, 0.0]);
        let out = resolve_attack(&hero(vec![Skill::Kindle]), &foe(Element::Electro), &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 0.0);
        assert_eq!(out.flags, vec![Narrative::Stunned]);
        assert_eq!(rng.remaining(), 1);
    }

    #[test]
    fn anemo_dodge_negates() {
        let mut rng = ScriptedRolls::new([0.9, 0.2]);
        let out = resolve_attack(&hero(vec![]), &foe(Element::Anemo), &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 0.0);
        assert!(out.has(&Narrative::Dodged));
    }

    #[test]
    fn monsters_are_never_stunned_by_elements() {
        let mut attacker = foe(Element::Physical);
        attacker.min_damage = 5.0;
        attacker.max_damage = 5.0;
        let mut target = foe(Element::Electro);
        target.def_chance = 0.0;
        let mut rng = ScriptedRolls::new([0.9, 0.9]);
        let out = resolve_attack(&attacker, &target, &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 5.0);
    }

    #[test]
    fn vigilance_fires_once_per_encounter() {
        let player = hero(vec![Skill::Vigilance]);
        let target = foe(Element::Hydro);
        let mut ctx = ExchangeContext::default();
        let mut rng = ScriptedRolls::new([0.9, 0.9, 0.9, 0.9]);
        let first = resolve_attack(&player, &target, &mut ctx, &mut rng);
        let second = resolve_attack(&player, &target, &mut ctx, &mut rng);
        assert_eq!(first.damage, 30.0);
        assert_eq!(second.damage, 20.0);
        assert!(ctx.vigilance_used);
    }

    #[test]
    fn kindle_and_leech() {
        let mut player = hero(vec![Skill::Kindle, Skill::Leech]);
        player.hp = 90.0;
        let mut target = foe(Element::Hydro);
        // crit miss, defense miss, leech hit
        let mut rng = ScriptedRolls::new([0.9, 0.9, 0.1]);
        let out = resolve_attack(&player, &target, &mut Default::default(), &mut rng);
        assert_eq!(out.damage, 30.0);
        assert_eq!(out.heal, 2.5);
        apply_attack(&out, &mut player, &mut target);
        assert_eq!(player.hp, 92.5);
        assert_eq!(target.hp, 20.0);
    }

    #[test]
    fn heals_and_damage_clamp() {
        let mut c = hero(vec![]);
        assert_eq!(c.heal(50.0), 0.0);
        assert_eq!(c.hp, 100.0);
        assert_eq!(c.take_damage(250.0), 100.0);
        assert_eq!(c.hp, 0.0);
        assert!(c.is_defeated());
    }

    #[test]
    fn burn_ticks_every_turn_cripple_is_gated() {
        let pyro = foe(Element::Pyro);
        let cryo = foe(Element::Cryo);
        let mut player = hero(vec![]);
        let mut rng = ScriptedRolls::new([0.5, 0.01]);
        let burn = apply_status_effects(&pyro, &mut player, &mut rng);
        assert_eq!(burn, vec![StatusTick { kind: StatusKind::Burn, damage: 3.0 }]);
        // pyro consumed no roll
        assert!(apply_status_effects(&cryo, &mut player, &mut rng).is_empty());
        let crip = apply_status_effects(&cryo, &mut player, &mut rng);
        assert_eq!(crip[0].kind, StatusKind::Cripple);
        assert_eq!(player.hp, 87.0);
    }

    #[test]
    fn damage_never_negative_and_hp_in_bounds() {
        let mut rng = StdRng::seed_from_u64(99);
        for element in [Element::Pyro, Element::Cryo, Element::Electro, Element::Anemo, Element::Geo] {
            let mut player = hero(vec![Skill::Kindle, Skill::Leech, Skill::Vigilance]);
            let mut monster = foe(element);
            let mut ctx = ExchangeContext::default();
            for _ in 0..200 {
                let out = resolve_attack(&player, &monster, &mut ctx, &mut rng);
                assert!(out.damage >= 0.0);
                apply_attack(&out, &mut player, &mut monster);
                let back = resolve_attack(&monster, &player, &mut ExchangeContext::default(), &mut rng);
                assert!(back.damage >= 0.0);
                apply_attack(&back, &mut monster, &mut player);
                apply_status_effects(&monster, &mut player, &mut rng);
                for c in [&player, &monster] {
                    assert!(c.hp >= 0.0 && c.hp <= c.max_hp);
                }
                if monster.is_defeated() {
                    monster.hp = monster.max_hp;
                }
                if player.is_defeated() {
                    player.hp = player.max_hp;
                }
            }
        }
    }

    #[test]
    fn two_decimal_display() {
        assert_eq!(format_damage(12.3456), "12.35");
        assert_eq!(format_damage(0.0), "0.00");
    }
}
