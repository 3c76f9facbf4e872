//! Session registry.
//!
//! The only place session state is created. Entries are created lazily on
//! first reference and never removed; a logged-out account keeps its handle
//! and is reset in place on the next login.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::session::SessionHandle;
use crate::store::AccountId;

pub struct SessionRegistry {
    sessions: DashMap<AccountId, Arc<SessionHandle>>,
    initial_backoff: Duration,
}

impl SessionRegistry {
    pub fn new(initial_backoff: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            initial_backoff,
        }
    }

    /// Idempotent; never fails.
    pub fn get_or_create(&self, id: AccountId) -> Arc<SessionHandle> {
        if let Some(existing) = self.sessions.get(&id) {
            return existing.value().clone();
        }
        self.sessions
            .entry(id)
            .or_insert_with(|| Arc::new(SessionHandle::new(id, self.initial_backoff)))
            .value()
            .clone()
    }

    /// Look up without creating.
    pub fn get(&self, id: AccountId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(&id).map(|s| s.value().clone())
    }

    pub fn ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of sessions currently holding a connection handle.
    pub fn live_connections(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().connection().is_some())
            .count()
    }
}
