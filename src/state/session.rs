//! Per-account runtime state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use fleetwatch_proto::WorldConnection;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::phase::{PhaseInput, SessionPhase};
use crate::capture::WorldCapture;
use crate::store::AccountId;

/// Chat lines buffered per subscriber before it starts lagging.
const CHAT_CAPACITY: usize = 256;

/// Mutable state of one account. Owned by its [`SessionHandle`].
pub struct SessionState {
    /// Live connection, at most one.
    pub connection: Option<Arc<dyn WorldConnection>>,
    /// Bumped whenever the connection is replaced or dropped; events tagged
    /// with an older generation are stale.
    pub generation: u64,
    pub phase: SessionPhase,
    pub reconnect_timer: Option<JoinHandle<()>>,
    /// Identifies the timer in `reconnect_timer`.
    pub reconnect_seq: u64,
    pub backoff: Duration,
    /// Account-local login cooldown.
    pub cooldown_until: Option<Instant>,
    pub code_expires_at: Option<Instant>,
    /// Set by an explicit logout; suppresses automatic reconnects.
    pub suppressed: bool,
    pub outbox: VecDeque<String>,
    pub draining: bool,
    pub last_outbound: Option<Instant>,
    pub capture: WorldCapture,
    pub settle_task: Option<JoinHandle<()>>,
    pub scope: Option<String>,
    pub label: Option<String>,
    /// In-world name of the current connection.
    pub username: Option<String>,
}

impl SessionState {
    fn new(backoff: Duration) -> Self {
        Self {
            connection: None,
            generation: 0,
            phase: SessionPhase::Disconnected,
            reconnect_timer: None,
            reconnect_seq: 0,
            backoff,
            cooldown_until: None,
            code_expires_at: None,
            suppressed: false,
            outbox: VecDeque::new(),
            draining: false,
            last_outbound: None,
            capture: WorldCapture::default(),
            settle_task: None,
            scope: None,
            label: None,
            username: None,
        }
    }

    /// Joined and still holding its connection.
    pub fn is_online(&self) -> bool {
        self.phase.is_connected() && self.connection.is_some()
    }

    /// Online and settled, so queued commands may go out.
    pub fn accepts_commands(&self) -> bool {
        self.phase.is_ready() && self.connection.is_some()
    }

    pub fn apply(&mut self, input: PhaseInput) -> SessionPhase {
        self.phase = self.phase.on(input);
        self.phase
    }

    /// Install a new connection, closing any existing one first.
    /// Returns the generation that events from `conn` must carry.
    pub fn install_connection(&mut self, conn: Arc<dyn WorldConnection>) -> u64 {
        if let Some(old) = self.take_connection() {
            old.close("relogin");
        }
        self.connection = Some(conn);
        self.generation
    }

    /// Remove the connection without closing it and invalidate its events.
    pub fn take_connection(&mut self) -> Option<Arc<dyn WorldConnection>> {
        self.generation += 1;
        self.username = None;
        self.connection.take()
    }

    /// The connection, if it is still the one tagged `generation`.
    pub fn connection_for(&self, generation: u64) -> Option<Arc<dyn WorldConnection>> {
        if self.generation == generation {
            self.connection.clone()
        } else {
            None
        }
    }

    pub fn cancel_reconnect(&mut self) -> bool {
        match self.reconnect_timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_settle(&mut self) {
        if let Some(task) = self.settle_task.take() {
            task.abort();
        }
    }

    /// Extend the account cooldown to `until` (never shortens it).
    pub fn extend_cooldown(&mut self, until: Instant) {
        if self.cooldown_until.is_none_or(|t| t < until) {
            self.cooldown_until = Some(until);
        }
    }

    pub fn display_name(&self, id: AccountId) -> String {
        self.label.clone().unwrap_or_else(|| format!("alt-{id}"))
    }
}

/// Shared handle to one account's session.
pub struct SessionHandle {
    pub id: AccountId,
    state: Mutex<SessionState>,
    chat: broadcast::Sender<String>,
    online: watch::Sender<bool>,
    /// Serializes in-world command issuance (drains, marker captures,
    /// ensure-home, scans) for this account.
    command_lock: tokio::sync::Mutex<()>,
}

impl SessionHandle {
    pub fn new(id: AccountId, backoff: Duration) -> Self {
        let (chat, _) = broadcast::channel(CHAT_CAPACITY);
        let (online, _) = watch::channel(false);
        Self {
            id,
            state: Mutex::new(SessionState::new(backoff)),
            chat,
            online,
            command_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Lock the state. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub fn connection(&self) -> Option<Arc<dyn WorldConnection>> {
        self.state.lock().connection.clone()
    }

    pub fn is_online(&self) -> bool {
        self.state.lock().is_online()
    }

    /// Subscribe to chat lines. Subscribe before sending the command whose
    /// reply you are waiting for.
    pub fn subscribe_chat(&self) -> broadcast::Receiver<String> {
        self.chat.subscribe()
    }

    pub fn publish_chat(&self, line: String) {
        // No subscribers is fine.
        let _ = self.chat.send(line);
    }

    pub fn set_online(&self, online: bool) {
        self.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }

    pub fn watch_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    pub async fn command_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.command_lock.lock().await
    }
}
