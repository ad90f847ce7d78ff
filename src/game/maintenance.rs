//! Periodic maintenance sweep.
//!
//! Runs [`GameEngine::run_maintenance`] on a fixed interval until the shutdown
//! channel flips to `true`. A failed run is logged and the next tick proceeds
//! as normal.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::game::engine::GameEngine;

/// Sweep schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

/// Start the sweep task. Returns `None` when maintenance is disabled.
pub fn spawn_maintenance(
    engine: Arc<GameEngine>,
    config: &MaintenanceConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Maintenance sweep disabled");
        return None;
    }
    let period = Duration::from_secs(config.interval_secs.max(1));
    info!("Maintenance sweep every {}s", period.as_secs());
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the sweep starts one period in.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match engine.run_maintenance().await {
                        Ok(report) => debug!(
                            "Maintenance run: {} checked, {} starving, {} failed",
                            report.dragons_checked, report.starved, report.failures
                        ),
                        Err(e) => error!("Maintenance run failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Maintenance sweep stopping");
                        break;
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::ManualClock;
    use crate::game::engine::GameSettings;
    use crate::game::storage::DragonStoreBuilder;
    use crate::game::types::DragonOwner;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn disabled_sweep_does_not_spawn() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        let engine = Arc::new(GameEngine::new(
            store,
            GameSettings::default(),
            Arc::new(ManualClock::new(Utc::now())),
        ));
        let (_tx, rx) = watch::channel(false);
        let config = MaintenanceConfig {
            enabled: false,
            ..MaintenanceConfig::default()
        };
        assert!(spawn_maintenance(engine, &config, rx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_runs_and_stops_on_shutdown() {
        let dir = TempDir::new().expect("tempdir");
        let store = DragonStoreBuilder::new(dir.path()).open().expect("store");
        let start = store
            .get_dragon(&DragonOwner::World)
            .expect("world dragon")
            .last_tick;
        let clock = Arc::new(ManualClock::new(start));
        let engine = Arc::new(GameEngine::new(store, GameSettings::default(), clock.clone()));
        let (tx, rx) = watch::channel(false);
        let config = MaintenanceConfig {
            enabled: true,
            interval_secs: 300,
        };
        let handle = spawn_maintenance(engine.clone(), &config, rx).expect("spawned");

        clock.advance(chrono::Duration::minutes(50));
        tokio::time::sleep(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;
        let dragon = engine.store().get_dragon(&DragonOwner::World).expect("dragon");
        assert_eq!(dragon.hunger, 30);

        tx.send(true).expect("send shutdown");
        handle.await.expect("task joins");
    }
}
