/// Tests for the shop, the daily bonus and the leaderboard
mod common;

use chrono::Duration;

use common::{fixture, fixture_with};
use dragonkeep::game::{Actor, DragonMode, GameCommand, GameError, Outcome};

#[tokio::test]
async fn test_buy_debits_gold_and_credits_inventory() {
    let fx = fixture(DragonMode::Shared);
    let ann = Actor::new("ann", "Ann");
    let purchase = fx.engine.buy(&ann, "meat").await.unwrap();
    assert_eq!(purchase.price, 15);
    assert_eq!(purchase.gold_left, 85);
    assert_eq!(purchase.owned, 1);

    let player = fx.engine.store().get_player("ann").unwrap();
    assert_eq!(player.gold, 85);
    assert_eq!(player.item_count("meat"), 1);
}

#[tokio::test]
async fn test_buy_with_insufficient_gold_changes_nothing() {
    let fx = fixture_with(DragonMode::Shared, |s| s.starting_gold = 20);
    let ann = Actor::new("ann", "Ann");
    let err = fx.engine.buy(&ann, "healing_herb").await.unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientGold {
            needed: 30,
            available: 20
        }
    ));
    let player = fx.engine.store().get_player("ann").unwrap();
    assert_eq!(player.gold, 20);
    assert!(player.inventory.is_empty());
}

#[tokio::test]
async fn test_unknown_item_is_rejected() {
    let fx = fixture(DragonMode::Shared);
    let ann = Actor::new("ann", "Ann");
    let err = fx.engine.buy(&ann, "unicorn_horn").await.unwrap_err();
    assert!(matches!(err, GameError::UnknownItem(_)));
    assert_eq!(fx.engine.store().get_player("ann").unwrap().gold, 100);
}

#[tokio::test]
async fn test_daily_bonus_once_per_date() {
    let fx = fixture(DragonMode::Shared);
    let ann = Actor::new("ann", "Ann");

    let first = fx.engine.claim_daily(&ann).await.unwrap();
    assert!((20..=50).contains(&first.gold));
    assert!((10..=30).contains(&first.exp));
    let gold_after_first = fx.engine.store().get_player("ann").unwrap().gold;
    assert_eq!(gold_after_first, 100 + first.gold);

    let err = fx.engine.claim_daily(&ann).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyClaimedToday));
    assert_eq!(fx.engine.store().get_player("ann").unwrap().gold, gold_after_first);

    fx.clock.advance(Duration::days(1));
    let second = fx.engine.claim_daily(&ann).await.unwrap();
    let player = fx.engine.store().get_player("ann").unwrap();
    assert_eq!(player.gold, gold_after_first + second.gold);
    assert_eq!(player.last_daily, Some(fx.engine.now().date_naive()));
}

#[tokio::test]
async fn test_leaderboard_orders_by_reputation_then_level() {
    let fx = fixture(DragonMode::Shared);
    for id in ["ann", "bob", "cid"] {
        fx.engine.profile(&Actor::new(id, id)).await.unwrap();
    }
    let store = fx.engine.store();
    let mut bob = store.get_player("bob").unwrap();
    bob.reputation = 10;
    store.put_player(bob).unwrap();
    let mut cid = store.get_player("cid").unwrap();
    cid.level = 3;
    store.put_player(cid).unwrap();

    let outcome = fx
        .engine
        .execute(&Actor::new("ann", "ann"), GameCommand::Top)
        .await
        .unwrap();
    let Outcome::Leaderboard(entries) = outcome else {
        panic!("expected leaderboard");
    };
    let order: Vec<&str> = entries.iter().map(|e| e.player_id.as_str()).collect();
    assert_eq!(order, vec!["bob", "cid", "ann"]);
    assert_eq!(entries[0].rank, 1);
}
