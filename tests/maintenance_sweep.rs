/// Tests for the background sweep: accrual for every stored dragon and the
/// long-neglect starvation penalty.
mod common;

use chrono::Duration;

use common::fixture;
use dragonkeep::game::{Actor, DragonMode, DragonOwner};

#[tokio::test]
async fn test_sweep_accrues_tended_dragons() {
    let fx = fixture(DragonMode::Personal);
    fx.engine.start(&Actor::new("ann", "Ann")).await.unwrap();
    fx.engine.start(&Actor::new("bob", "Bob")).await.unwrap();

    fx.clock.advance(Duration::minutes(50));
    let report = fx.engine.run_maintenance().await.unwrap();
    // Two personal dragons; nobody can tend the world dragon in personal mode.
    assert_eq!(report.dragons_checked, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.starved, 0);
    assert_eq!(report.failures, 0);

    for id in ["ann", "bob"] {
        let dragon = fx.engine.store().get_dragon(&DragonOwner::player(id)).unwrap();
        assert_eq!(dragon.hunger, 30);
        assert_eq!(dragon.last_tick, fx.engine.now());
    }
}

#[tokio::test]
async fn test_neglected_dragon_starves_but_survives() {
    let fx = fixture(DragonMode::Personal);
    let ann = Actor::new("ann", "Ann");
    fx.engine.start(&ann).await.unwrap();

    fx.clock.advance(Duration::hours(361));
    let report = fx.engine.run_maintenance().await.unwrap();
    assert!(report.starved >= 1);
    let first = fx.engine.store().get_dragon(&DragonOwner::player("ann")).unwrap();
    assert_eq!(first.hunger, 0);

    for _ in 0..20 {
        fx.engine.run_maintenance().await.unwrap();
    }
    let dragon = fx.engine.store().get_dragon(&DragonOwner::player("ann")).unwrap();
    assert_eq!(dragon.health, 1);
    assert_eq!(dragon.mood, 0);
}

#[tokio::test]
async fn test_feeding_stops_starvation() {
    let fx = fixture(DragonMode::Personal);
    let ann = Actor::new("ann", "Ann");
    fx.engine.start(&ann).await.unwrap();
    fx.engine.buy(&ann, "meat").await.unwrap();
    fx.clock.advance(Duration::hours(400));
    fx.engine.feed(&ann, "meat").await.unwrap();
    let fed = fx.engine.store().get_dragon(&DragonOwner::player("ann")).unwrap();

    let report = fx.engine.run_maintenance().await.unwrap();
    assert_eq!(report.starved, 0);
    let after = fx.engine.store().get_dragon(&DragonOwner::player("ann")).unwrap();
    assert_eq!(after.health, fed.health);
    assert_eq!(after.mood, fed.mood);
}

#[tokio::test]
async fn test_shared_mode_duel_dragons_do_not_age() {
    let fx = fixture(DragonMode::Shared);
    let ann = Actor::new("ann", "Ann");
    let bob = Actor::new("bob", "Bob");
    fx.engine.start(&ann).await.unwrap();
    fx.engine.start(&bob).await.unwrap();
    let duel = fx.engine.challenge(&ann, "bob").await.unwrap();
    fx.engine.accept_duel(&bob, &duel.id).await.unwrap();

    let store = fx.engine.store();
    let before = store.get_dragon(&DragonOwner::player("ann")).unwrap();
    for _ in 0..20 {
        fx.clock.advance(Duration::days(1));
        let report = fx.engine.run_maintenance().await.unwrap();
        assert_eq!(report.dragons_checked, 1);
        assert_eq!(report.skipped, 2);
    }

    let after = store.get_dragon(&DragonOwner::player("ann")).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.health, after.max_health);
    let world = store.get_dragon(&DragonOwner::World).unwrap();
    assert_eq!(world.hunger, 0);
    assert_eq!(world.last_tick, fx.engine.now());
}
