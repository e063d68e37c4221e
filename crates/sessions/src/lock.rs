//! Per-session turn locks.
//!
//! Two messages from the same chat must not interleave their state
//! read-modify-write, while different chats run fully in parallel. Each
//! session gets its own async mutex; the map holding them is a short-lived
//! `std::sync::Mutex`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle locks are dropped once the map grows past this many entries.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the turn of `session_id`. The turn ends when the guard drops.
    pub async fn acquire(&self, session_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(session_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
