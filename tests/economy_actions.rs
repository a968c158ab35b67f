//! Timed actions, crafting, expeditions, and wallet writes against a real store.
mod common;

use std::sync::Arc;

use abyssbot::economy::{Action, ExpeditionClaim};
use abyssbot::errors::GameError;
use abyssbot::game::DropResult;
use abyssbot::storage::{
    ExpeditionRecord, GameStoreBuilder, PlayerRecord, PlayerStore, PlayerUpdate, WalletStore,
};
use common::{harness, START_MS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn give(h: &common::Harness, user: &str, items: &[(&str, u32)]) {
    h.store()
        .update_player(
            user,
            &PlayerUpdate::new().add_items(items.iter().map(|(i, q)| DropResult::new(*i, *q))),
        )
        .unwrap();
}

#[test]
fn explore_credits_chest_and_starts_cooldown() {
    let h = harness();
    h.coord.register("bennett").unwrap();
    let before = h.store().balance("bennett").unwrap();
    let mut rng = StdRng::seed_from_u64(21);

    let chest = h.coord.explore("bennett", &mut rng).unwrap();
    let (lo, hi) = chest.rarity.coin_range();
    assert!(chest.coins >= lo as u64 && chest.coins <= hi as u64);
    assert!(chest.items.len() <= chest.rarity.max_items());

    let player = h.store().get_player("bennett").unwrap();
    assert_eq!(player.balance, before + chest.coins);
    for item in &chest.items {
        assert!(player.item_amount(&item.item) >= item.quantity);
    }

    assert!(matches!(
        h.coord.explore("bennett", &mut rng),
        Err(GameError::OnCooldown { .. })
    ));
    // gather has its own timer
    h.coord.gather("bennett", &mut rng).unwrap();
    assert!(matches!(
        h.coord.gather("bennett", &mut rng),
        Err(GameError::OnCooldown { .. })
    ));

    h.clock.advance(600_000);
    assert!(h.coord.explore("bennett", &mut rng).is_ok());
}

#[test]
fn cooldown_expires_exactly_at_deadline() {
    let h = harness();
    h.coord.register("bennett").unwrap();
    let mut rng = StdRng::seed_from_u64(22);
    h.coord.gather("bennett", &mut rng).unwrap();

    h.clock.advance(119_999);
    assert!(!h.coord.cooldown_status("bennett", Action::Gather).unwrap().is_ready());
    h.clock.advance(1);
    assert!(h.coord.cooldown_status("bennett", Action::Gather).unwrap().is_ready());
}

#[test]
fn craft_checks_materials_then_consumes_them() {
    let h = harness();
    h.coord.register("xiangling").unwrap();

    match h.coord.craft("xiangling", "Mystic Enhancement Ore") {
        Err(GameError::MissingMaterials(msg)) => {
            assert!(msg.contains("Crystal Chunk x1"));
            assert!(msg.contains("Iron Chunk x2"));
        }
        other => panic!("expected missing materials, got {:?}", other),
    }
    assert!(h.coord.cooldown_status("xiangling", Action::Craft).unwrap().is_ready());

    give(&h, "xiangling", &[("Crystal Chunk", 1), ("Iron Chunk", 3)]);
    let out = h.coord.craft("xiangling", "mystic enhancement ore").unwrap();
    assert_eq!(out, DropResult::new("Mystic Enhancement Ore", 1));

    let p = h.store().get_player("xiangling").unwrap();
    assert_eq!(p.item_amount("Crystal Chunk"), 0);
    assert_eq!(p.item_amount("Iron Chunk"), 1);
    assert_eq!(p.item_amount("Mystic Enhancement Ore"), 1);

    assert!(matches!(
        h.coord.craft("xiangling", "Excalibur"),
        Err(GameError::UnknownRecipe(_))
    ));
}

#[test]
fn kitchen_and_forge_cooldowns_are_independent() {
    let h = harness();
    h.coord.register("xiangling").unwrap();
    give(
        &h,
        "xiangling",
        &[("Crystal Chunk", 2), ("Iron Chunk", 4), ("Mint", 6)],
    );

    h.coord.craft("xiangling", "Mystic Enhancement Ore").unwrap();
    h.coord.craft("xiangling", "Mint Salad").unwrap();

    match h.coord.craft("xiangling", "Mystic Enhancement Ore") {
        Err(GameError::OnCooldown { action, wait_until_ms }) => {
            assert_eq!(action, "craft");
            assert_eq!(wait_until_ms, START_MS + 30_000);
        }
        other => panic!("expected craft cooldown, got {:?}", other),
    }
    assert!(matches!(
        h.coord.craft("xiangling", "Mint Salad"),
        Err(GameError::OnCooldown { .. })
    ));

    h.clock.advance(30_000);
    h.coord.craft("xiangling", "Mint Salad").unwrap();
    assert_eq!(
        h.store().get_player("xiangling").unwrap().item_amount("Mint Salad"),
        2
    );
}

#[test]
fn eating_food_heals_up_to_max() {
    let h = harness();
    let mut p = h.coord.register("diluc").unwrap();
    p.hp = 90.0;
    h.store().put_player(p).unwrap();
    give(&h, "diluc", &[("Sweet Madame", 1)]);

    let healed = h.coord.eat("diluc", "Sweet Madame").unwrap();
    assert_eq!(healed, 10.0);
    let p = h.store().get_player("diluc").unwrap();
    assert_eq!(p.hp, 100.0);
    assert_eq!(p.item_amount("Sweet Madame"), 0);

    assert!(matches!(
        h.coord.eat("diluc", "Sweet Madame"),
        Err(GameError::MissingMaterials(_))
    ));
    assert!(matches!(
        h.coord.eat("diluc", "Iron Chunk"),
        Err(GameError::InvalidState(_))
    ));
}

#[test]
fn expedition_blocks_actions_until_claimed() {
    let h = harness();
    h.coord.register("razor").unwrap();
    let before = h.store().balance("razor").unwrap();
    let mut rng = StdRng::seed_from_u64(31);

    let active = h.coord.start_expedition("razor", "whispering woods").unwrap();
    assert_eq!(active.ends_at_ms, START_MS + 3_600_000);
    assert!(matches!(
        h.coord.start_expedition("razor", "Starfell Lake"),
        Err(GameError::Travelling)
    ));
    assert!(matches!(h.coord.begin_hunt("razor", &mut rng), Err(GameError::Travelling)));
    assert!(matches!(h.coord.explore("razor", &mut rng), Err(GameError::Travelling)));

    h.clock.advance(3_599_999);
    match h.coord.claim_expedition("razor", &mut rng).unwrap() {
        ExpeditionClaim::NotReady { destination, ends_at_ms } => {
            assert_eq!(destination, "Whispering Woods");
            assert_eq!(ends_at_ms, START_MS + 3_600_000);
        }
        other => panic!("expected not ready, got {:?}", other),
    }

    h.clock.advance(1);
    match h.coord.claim_expedition("razor", &mut rng).unwrap() {
        ExpeditionClaim::Completed { coins, .. } => assert_eq!(coins, 300),
        other => panic!("expected completion, got {:?}", other),
    }
    let p = h.store().get_player("razor").unwrap();
    assert!(!p.is_travelling);
    assert!(p.expedition.is_none());
    assert_eq!(p.balance, before + 300);

    assert!(matches!(
        h.coord.start_expedition("razor", "Whispering Woods"),
        Err(GameError::OnCooldown { .. })
    ));
    assert!(matches!(
        h.coord.claim_expedition("razor", &mut rng),
        Err(GameError::InvalidState(_))
    ));
    h.clock.advance(60_000);
    assert!(h.coord.start_expedition("razor", "Whispering Woods").is_ok());
}

#[test]
fn damaged_expedition_is_reset_not_fatal() {
    let h = harness();
    let mut rng = StdRng::seed_from_u64(32);

    let mut p = h.coord.register("fischl").unwrap();
    p.is_travelling = true;
    p.expedition = Some(ExpeditionRecord {
        destination: Some("Atlantis".into()),
        ..ExpeditionRecord::default()
    });
    h.store().put_player(p).unwrap();
    assert_eq!(
        h.coord.claim_expedition("fischl", &mut rng).unwrap(),
        ExpeditionClaim::CorruptedReset
    );
    let p = h.store().get_player("fischl").unwrap();
    assert!(!p.is_travelling);
    assert!(p.expedition.is_none());

    // travelling flag with nothing behind it
    let mut p = p;
    p.is_travelling = true;
    h.store().put_player(p).unwrap();
    assert_eq!(
        h.coord.claim_expedition("fischl", &mut rng).unwrap(),
        ExpeditionClaim::CorruptedReset
    );
    assert!(h.coord.explore("fischl", &mut rng).is_ok());
}

#[test]
fn world_level_stays_in_range() {
    let h = harness();
    h.coord.register("mona").unwrap();
    assert!(matches!(
        h.coord.change_level("mona", false),
        Err(GameError::InvalidState(_))
    ));
    assert_eq!(h.coord.change_level("mona", true).unwrap(), 2);
    assert_eq!(h.store().get_player("mona").unwrap().level, 2);
}

#[test]
fn concurrent_credits_all_land() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        GameStoreBuilder::new(dir.path().join("wallets"))
            .write_retries(10_000)
            .open()
            .unwrap(),
    );
    store.put_player(PlayerRecord::new("keqing")).unwrap();

    std::thread::scope(|s| {
        for _ in 0..8 {
            let store = Arc::clone(&store);
            s.spawn(move || {
                for _ in 0..25 {
                    store.add_balance("keqing", 2, false, "test").unwrap();
                }
            });
        }
    });

    assert_eq!(store.balance("keqing").unwrap(), 8 * 25 * 2);
}

#[test]
fn debit_never_goes_negative() {
    let h = harness();
    h.coord.register("qiqi").unwrap();
    let balance = h.store().balance("qiqi").unwrap();
    assert!(matches!(
        h.store().remove_balance("qiqi", balance + 1, true, "overdraw"),
        Err(GameError::InsufficientFunds)
    ));
    assert_eq!(h.store().balance("qiqi").unwrap(), balance);
    assert_eq!(h.store().remove_balance("qiqi", balance, true, "spend").unwrap(), 0);
    let log = h.store().wallet_log("qiqi").unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].delta, -(balance as i64));
}
