//! Per-entity async locks.
//!
//! Every read-modify-write of a stored entity happens while holding the lock for its
//! key. Multi-entity operations go through [`EntityLocks::lock_many`], which acquires
//! in sorted key order. Keys sort as `boss` < `dragon:*` < `duel:*` < `player:*`,
//! which is the global acquisition order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub type EntityGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct EntityLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: &str) -> EntityGuard {
        self.slot(key).lock_owned().await
    }

    /// Lock several keys at once. Duplicates are collapsed.
    pub async fn lock_many(&self, keys: &[String]) -> Vec<EntityGuard> {
        let mut ordered: Vec<&String> = keys.iter().collect();
        ordered.sort();
        ordered.dedup();
        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
