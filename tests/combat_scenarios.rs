//! End-to-end checks of scaling, combat clamps and chest rarity edges.
use abyssbot::game::catalog::{find_monster, WORLD_MONSTERS};
use abyssbot::game::combat::{apply_attack, resolve_attack, Combatant, ExchangeContext};
use abyssbot::game::loot::{rarity_for_roll, resolve_chest, resolve_monster_drops, ChestRarity};
use abyssbot::game::{atk_scale_multiplier, hp_scale_multiplier};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn level_one_slime_matches_base_stats() {
    let slime = &WORLD_MONSTERS[0];
    assert_eq!(slime.base_hp, 10.0);
    assert_eq!(slime.base_atk, 4.0);
    assert_eq!(slime.min_level, 1);
    assert_eq!(hp_scale_multiplier(1), 1.0);
    assert_eq!(atk_scale_multiplier(1), 1.0);

    let stats = slime.stats_at(1).expect("available at level 1");
    assert_eq!(stats.min_hp, 9.0);
    assert_eq!(stats.max_hp, 11.0);
    assert_eq!(stats.min_damage, 3.0);
    assert_eq!(stats.max_damage, 5.0);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let inst = slime.spawn(1, &mut rng).unwrap();
        assert!((9.0..=11.0).contains(&inst.hp));
    }
}

#[test]
fn gated_monsters_are_unavailable() {
    let ruin_hunter = find_monster("Ruin Hunter").unwrap();
    assert!(ruin_hunter.min_level > 1);
    assert!(ruin_hunter.stats_at(ruin_hunter.min_level as i64 - 1).is_none());
    assert!(ruin_hunter.stats_at(ruin_hunter.min_level as i64).is_some());
    assert!(WORLD_MONSTERS[0].stats_at(0).is_none());
    assert!(WORLD_MONSTERS[0].stats_at(-4).is_none());
}

#[test]
fn out_of_domain_levels_do_not_scale() {
    for level in [-10, -1, 0] {
        assert_eq!(hp_scale_multiplier(level), 1.0);
        assert_eq!(atk_scale_multiplier(level), 1.0);
    }
}

#[test]
fn chest_rarity_boundaries() {
    assert_eq!(rarity_for_roll(0.0), ChestRarity::Common);
    assert_eq!(rarity_for_roll(25.999), ChestRarity::Common);
    assert_eq!(rarity_for_roll(26.0), ChestRarity::Exquisite);
    assert_eq!(rarity_for_roll(76.999), ChestRarity::Exquisite);
    assert_eq!(rarity_for_roll(77.0), ChestRarity::Precious);
    assert_eq!(rarity_for_roll(97.0), ChestRarity::Remarkable);
    assert_eq!(rarity_for_roll(99.999), ChestRarity::Remarkable);
}

#[test]
fn hp_stays_in_bounds_over_random_duels() {
    let mut rng = StdRng::seed_from_u64(99);
    for (i, def) in WORLD_MONSTERS.iter().enumerate() {
        let level = def.min_level as i64 + i as i64;
        let monster = def.spawn(level, &mut rng).unwrap();
        let mut foe = Combatant::from_monster(&monster);
        let mut hero = Combatant::player("hero", 80.0, 100.0, 12.0, 30.0, 2.0, 20.0, 3.0, vec![]);
        let mut ctx = ExchangeContext::default();
        for _ in 0..50 {
            let hit = resolve_attack(&foe, &hero, &mut ExchangeContext::default(), &mut rng);
            assert!(hit.damage >= 0.0);
            apply_attack(&hit, &mut foe, &mut hero);
            let swing = resolve_attack(&hero, &foe, &mut ctx, &mut rng);
            assert!(swing.damage >= 0.0);
            apply_attack(&swing, &mut hero, &mut foe);
            assert!((0.0..=hero.max_hp).contains(&hero.hp));
            assert!((0.0..=foe.max_hp).contains(&foe.hp));
            if hero.is_defeated() || foe.is_defeated() {
                break;
            }
        }
    }
}

#[test]
fn loot_quantities_are_positive() {
    let mut rng = StdRng::seed_from_u64(3);
    for level in [1, 5, 12, 30] {
        for _ in 0..500 {
            let chest = resolve_chest(level, &mut rng);
            assert!(chest.items.len() <= chest.rarity.max_items());
            assert!(chest.items.iter().all(|d| d.quantity >= 1));
        }
    }
    for def in WORLD_MONSTERS {
        for _ in 0..100 {
            assert!(resolve_monster_drops(def, &mut rng).iter().all(|d| d.quantity >= 1));
        }
    }
}
