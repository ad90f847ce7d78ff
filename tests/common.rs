//! Test utilities & fixtures.
//! Builds throwaway stores and engines driven by a manual clock.

use std::sync::Arc;

use chrono::Utc;
use dragonkeep::game::{DragonMode, DragonStoreBuilder, GameEngine, GameSettings, ManualClock};
use tempfile::TempDir;

pub struct Fixture {
    // Held so the sled directory outlives the engine.
    #[allow(dead_code)]
    pub dir: TempDir,
    pub engine: Arc<GameEngine>,
    pub clock: Arc<ManualClock>,
}

/// Engine in `mode` with a fixed RNG seed. `tweak` adjusts settings before the engine is built.
pub fn fixture_with(mode: DragonMode, tweak: impl FnOnce(&mut GameSettings)) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DragonStoreBuilder::new(dir.path()).open().expect("open store");
    let mut settings = GameSettings {
        dragon_mode: mode,
        rng_seed: Some(1234),
        ..GameSettings::default()
    };
    tweak(&mut settings);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = Arc::new(GameEngine::new(store, settings, clock.clone()));
    Fixture { dir, engine, clock }
}

#[allow(dead_code)]
pub fn fixture(mode: DragonMode) -> Fixture {
    fixture_with(mode, |_| {})
}
