//! Session state store.
//!
//! Maps a chat's session id to its [`SessionState`]. The trait keeps the lock
//! discipline out of the command processor so another backend (a shared
//! cache, say) can be swapped in without touching it.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use {async_trait::async_trait, tracing::trace};

use crate::{Result, SessionState};

#[async_trait]
pub trait SessionStateStore: Send + Sync {
    /// Current state for `session_id`, [`SessionState::None`] when unknown.
    async fn get(&self, session_id: i64) -> Result<SessionState>;

    /// Upsert the state for `session_id`.
    async fn set(&self, session_id: i64, state: SessionState) -> Result<()>;

    /// Forget `session_id`. Equivalent to setting `None` but frees the entry.
    async fn clear(&self, session_id: i64) -> Result<()>;
}

/// Process-local store guarded by a single mutex.
///
/// The mutex is a `std::sync::Mutex` because every operation is one map
/// lookup or insert; it is never held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemorySessionStateStore {
    states: Mutex<HashMap<i64, SessionState>>,
}

impl InMemorySessionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<i64, SessionState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of sessions with a non-default state.
    pub fn len(&self) -> usize {
        self.states().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStateStore for InMemorySessionStateStore {
    async fn get(&self, session_id: i64) -> Result<SessionState> {
        Ok(self
            .states()
            .get(&session_id)
            .copied()
            .unwrap_or_default())
    }

    async fn set(&self, session_id: i64, state: SessionState) -> Result<()> {
        trace!(session_id, %state, "set session state");
        let mut states = self.states();
        if state.is_none() {
            states.remove(&session_id);
        } else {
            states.insert(session_id, state);
        }
        Ok(())
    }

    async fn clear(&self, session_id: i64) -> Result<()> {
        trace!(session_id, "clear session state");
        self.states().remove(&session_id);
        Ok(())
    }
}
