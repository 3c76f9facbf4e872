//! Login admission queue.
//!
//! Every connection attempt (first login, manual login, automatic
//! reconnect, scheduled scan) goes through one FIFO drained by a single
//! worker, so the fleet never authenticates two accounts back to back faster
//! than the network tolerates.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info};

use crate::config::LoginConfig;
use crate::state::GlobalThrottle;
use crate::store::AccountId;

/// Result of one admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The account already had a joined session; nothing was attempted.
    AlreadyOnline,
    /// The new connection joined the world.
    Online,
    /// The authority wants a human to confirm a device code.
    AwaitingInteractive,
    /// No decisive event arrived within the join timeout. The session keeps
    /// running and may still join.
    Pending,
    /// The attempt failed; a reconnect has been scheduled where applicable.
    Failed(String),
    /// The entry was withdrawn (logout, credential wipe) before it connected.
    Cancelled,
}

impl LoginOutcome {
    /// Static label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyOnline => "already_online",
            Self::Online => "online",
            Self::AwaitingInteractive => "awaiting_interactive",
            Self::Pending => "pending",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::AlreadyOnline | Self::Online)
    }
}

/// What the queue worker drives.
#[async_trait]
pub trait LoginDriver: Send + Sync {
    /// Whether the account has a joined session.
    fn is_online(&self, id: AccountId) -> bool;

    /// The account's own cooldown deadline.
    fn account_cooldown(&self, id: AccountId) -> Option<Instant>;

    /// Open a fresh connection and wait for its first decisive event.
    async fn connect(&self, id: AccountId) -> LoginOutcome;
}

#[derive(Default)]
struct QueueInner {
    order: VecDeque<AccountId>,
    waiters: HashMap<AccountId, Vec<oneshot::Sender<LoginOutcome>>>,
    /// Account the worker has popped and not yet connected.
    in_flight: Option<AccountId>,
    /// Set when `in_flight` was withdrawn while it waited out a cooldown.
    in_flight_cancelled: bool,
}

/// FIFO of pending logins with per-account coalescing.
pub struct LoginQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    throttle: Arc<GlobalThrottle>,
    config: LoginConfig,
}

impl LoginQueue {
    pub fn new(throttle: Arc<GlobalThrottle>, config: LoginConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
            throttle,
            config,
        }
    }

    /// Register a waiter for `id`, appending it to the queue unless it is
    /// already queued.
    pub fn submit(&self, id: AccountId) -> oneshot::Receiver<LoginOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        if let Some(waiters) = inner.waiters.get_mut(&id) {
            debug!(account = id, "login already queued, coalescing");
            waiters.push(tx);
            return rx;
        }
        inner.waiters.insert(id, vec![tx]);
        inner.order.push_back(id);
        drop(inner);
        self.notify.notify_one();
        rx
    }

    /// Queue a login and wait for its outcome.
    pub async fn enqueue(&self, id: AccountId) -> LoginOutcome {
        match self.submit(id).await {
            Ok(outcome) => outcome,
            Err(_) => LoginOutcome::Failed("login queue closed".to_string()),
        }
    }

    /// Accounts waiting for their turn, in order.
    pub fn queued(&self) -> Vec<AccountId> {
        self.inner.lock().order.iter().copied().collect()
    }

    pub fn is_queued(&self, id: AccountId) -> bool {
        self.inner.lock().waiters.contains_key(&id)
    }

    /// Withdraw `id` from the queue. Its waiters resolve `Cancelled`; if
    /// the worker holds it and is still waiting out a cooldown, it is
    /// dropped before connecting. Returns whether anything was withdrawn.
    pub fn remove(&self, id: AccountId) -> bool {
        let mut inner = self.inner.lock();
        let waiters = inner.waiters.remove(&id);
        inner.order.retain(|queued| *queued != id);
        let in_flight = inner.in_flight == Some(id);
        if in_flight {
            inner.in_flight_cancelled = true;
        }
        drop(inner);

        let queued = waiters.is_some();
        if let Some(waiters) = waiters {
            debug!(account = id, waiters = waiters.len(), "queued login withdrawn");
            resolve(waiters, LoginOutcome::Cancelled);
        }
        queued || in_flight
    }

    /// Spawn the single worker that drains the queue.
    pub fn start(self: &Arc<Self>, driver: Arc<dyn LoginDriver>) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            info!("login queue worker started");
            loop {
                let next = queue.pop();
                match next {
                    Some((id, waiters)) => queue.process(id, waiters, driver.as_ref()).await,
                    None => queue.notify.notified().await,
                }
            }
        })
    }

    fn pop(&self) -> Option<(AccountId, Vec<oneshot::Sender<LoginOutcome>>)> {
        let mut inner = self.inner.lock();
        let id = inner.order.pop_front()?;
        let waiters = inner.waiters.remove(&id).unwrap_or_default();
        inner.in_flight = Some(id);
        inner.in_flight_cancelled = false;
        Some((id, waiters))
    }

    /// Clear the in-flight slot, reporting whether it had been withdrawn.
    fn take_in_flight(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.in_flight = None;
        std::mem::take(&mut inner.in_flight_cancelled)
    }

    async fn process(
        &self,
        id: AccountId,
        waiters: Vec<oneshot::Sender<LoginOutcome>>,
        driver: &dyn LoginDriver,
    ) {
        if let Some(until) = self.throttle.wait_until(driver.account_cooldown(id))
            && until > Instant::now()
        {
            let jitter = self.cooldown_jitter();
            debug!(account = id, wait_ms = (until - Instant::now()).as_millis() as u64, "login waiting for cooldown");
            sleep_until(until + jitter).await;
        }

        if self.take_in_flight() {
            debug!(account = id, "login withdrawn while waiting");
            resolve(waiters, LoginOutcome::Cancelled);
            crate::metrics::record_login("cancelled");
            return;
        }

        if driver.is_online(id) {
            resolve(waiters, LoginOutcome::AlreadyOnline);
            crate::metrics::record_login("already_online");
            sleep(self.config.already_online_settle()).await;
            return;
        }

        let outcome = driver.connect(id).await;
        info!(account = id, outcome = outcome.label(), "login attempt finished");
        crate::metrics::record_login(outcome.label());
        resolve(waiters, outcome);

        let gap = self.config.min_gap() + self.login_jitter();
        sleep(gap).await;
    }

    fn cooldown_jitter(&self) -> Duration {
        let (lo, hi) = (self.config.cooldown_jitter_min_ms, self.config.cooldown_jitter_max_ms);
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi.max(lo)))
    }

    fn login_jitter(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.config.jitter_ms))
    }
}

fn resolve(waiters: Vec<oneshot::Sender<LoginOutcome>>, outcome: LoginOutcome) {
    for waiter in waiters {
        // The caller may have stopped waiting.
        let _ = waiter.send(outcome.clone());
    }
}
