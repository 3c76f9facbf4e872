//! Process-wide login throttling.
//!
//! Two deadlines shared by every account: the network cooldown (set when the
//! network refuses new registrations) and the registration lock (set after
//! each successful join). Both only ever move forward.

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
struct Deadlines {
    network_cooldown: Option<Instant>,
    registration_lock: Option<Instant>,
}

/// Shared global deadlines. Cheap to query, safe to share across tasks.
#[derive(Debug, Default)]
pub struct GlobalThrottle {
    inner: Mutex<Deadlines>,
}

fn extend(slot: &mut Option<Instant>, until: Instant) -> bool {
    match slot {
        Some(current) if *current >= until => false,
        _ => {
            *slot = Some(until);
            true
        }
    }
}

impl GlobalThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network_cooldown(&self) -> Option<Instant> {
        self.inner.lock().network_cooldown
    }

    pub fn registration_lock(&self) -> Option<Instant> {
        self.inner.lock().registration_lock
    }

    /// Push the registration lock out to `until`. Returns whether it moved.
    pub fn extend_registration_lock(&self, until: Instant) -> bool {
        extend(&mut self.inner.lock().registration_lock, until)
    }

    /// Push both deadlines out to `until`.
    ///
    /// Returns `true` only when this opens a new network cooldown window,
    /// i.e. no network cooldown was in force at `now`.
    pub fn extend_network(&self, until: Instant, now: Instant) -> bool {
        let mut d = self.inner.lock();
        let was_active = d.network_cooldown.is_some_and(|t| t > now);
        let moved = extend(&mut d.network_cooldown, until);
        extend(&mut d.registration_lock, until);
        moved && !was_active
    }

    /// Latest of the global deadlines and an account's own cooldown.
    pub fn wait_until(&self, account_cooldown: Option<Instant>) -> Option<Instant> {
        let d = *self.inner.lock();
        [d.network_cooldown, d.registration_lock, account_cooldown]
            .into_iter()
            .flatten()
            .max()
    }
}
