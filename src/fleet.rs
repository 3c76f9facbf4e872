//! The fleet facade.
//!
//! [`Fleet`] owns every shared component (registry, throttle, admission
//! queue, reconnect controller, faction cache) and exposes the operations
//! callers use. The session lifecycle, outbox, marker capture and tracker
//! scans add further `impl Fleet` blocks in their own modules.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fleetwatch_proto::Connector;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{info, warn};

use crate::config::{Config, ConfigError, Patterns, validate};
use crate::error::FleetError;
use crate::notify::{NotificationSink, Notice};
use crate::session::{LoginDriver, LoginOutcome, LoginQueue, Reconnector};
use crate::state::{GlobalThrottle, PhaseInput, SessionHandle, SessionPhase, SessionRegistry};
use crate::store::{AccountId, AccountStatus, CredentialStore};
use crate::tracker::FactionCache;

/// Point-in-time view of one account's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: AccountId,
    pub label: Option<String>,
    pub phase: &'static str,
    pub online: bool,
    pub queued: bool,
    pub world: Option<String>,
}

pub(crate) struct FleetInner {
    pub(crate) config: Config,
    pub(crate) patterns: Patterns,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) throttle: Arc<GlobalThrottle>,
    pub(crate) queue: Arc<LoginQueue>,
    pub(crate) reconnector: Reconnector,
    pub(crate) cache: FactionCache,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running fleet. Cheap to clone.
#[derive(Clone)]
pub struct Fleet {
    pub(crate) inner: Arc<FleetInner>,
}

impl Fleet {
    /// Validate `config`, wire up the components and start the login queue
    /// worker. Must be called from within a tokio runtime.
    pub fn start(
        config: Config,
        store: Arc<dyn CredentialStore>,
        sink: Arc<dyn NotificationSink>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        validate(&config).map_err(ConfigError::Invalid)?;
        let patterns = Patterns::compile(&config)?;

        let registry = Arc::new(SessionRegistry::new(config.reconnect.min()));
        let throttle = Arc::new(GlobalThrottle::new());
        let queue = Arc::new(LoginQueue::new(Arc::clone(&throttle), config.login.clone()));
        let reconnector = Reconnector::new(
            Arc::clone(&registry),
            Arc::clone(&throttle),
            Arc::clone(&queue),
            config.reconnect.clone(),
            config.login.jitter_ms,
        );
        let cache = FactionCache::new(config.tracker.cache_ttl());

        let fleet = Self {
            inner: Arc::new(FleetInner {
                config,
                patterns,
                store,
                sink,
                connector,
                registry,
                throttle,
                queue: Arc::clone(&queue),
                reconnector,
                cache,
                worker: Mutex::new(None),
            }),
        };

        let worker = queue.start(Arc::new(fleet.clone()));
        *fleet.inner.worker.lock() = Some(worker);
        Ok(fleet)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn throttle(&self) -> &GlobalThrottle {
        &self.inner.throttle
    }

    pub fn cache(&self) -> &FactionCache {
        &self.inner.cache
    }

    pub(crate) fn session(&self, id: AccountId) -> Arc<SessionHandle> {
        self.inner.registry.get_or_create(id)
    }

    /// Queue a login through the admission queue and wait for its outcome.
    pub async fn login(&self, id: AccountId) -> LoginOutcome {
        self.inner.queue.enqueue(id).await
    }

    /// Close the session, withdraw any queued login and suppress automatic
    /// reconnects until the next explicit login.
    pub async fn logout(&self, id: AccountId) {
        let session = self.session(id);
        let (conn, was_connected) = {
            let mut state = session.lock();
            state.suppressed = true;
            state.cancel_reconnect();
            state.cancel_settle();
            state.capture.detach();
            state.draining = false;
            state.code_expires_at = None;
            let was_connected = state.is_online();
            let conn = state.take_connection();
            state.apply(PhaseInput::Logout);
            (conn, was_connected)
        };
        self.inner.queue.remove(id);

        if let Some(conn) = conn {
            info!(account = id, "logging out");
            conn.close("logout");
        }
        session.set_online(false);
        if was_connected {
            crate::metrics::session_left();
        }
        self.record_status(id, AccountStatus::Offline).await;
    }

    pub fn is_online(&self, id: AccountId) -> bool {
        self.inner.registry.get(id).is_some_and(|s| s.is_online())
    }

    /// Wait up to `within` for the account to be joined.
    pub async fn wait_for_online(&self, id: AccountId, within: Duration) -> bool {
        let session = self.session(id);
        let mut online = session.watch_online();
        let deadline = Instant::now() + within;
        loop {
            if session.is_online() {
                return true;
            }
            match timeout_at(deadline, online.changed()).await {
                Ok(Ok(())) => continue,
                _ => return session.is_online(),
            }
        }
    }

    /// The world label captured since the session was armed.
    pub fn get_world_label(&self, id: AccountId) -> Option<String> {
        let session = self.inner.registry.get(id)?;
        let state = session.lock();
        state.capture.label().map(str::to_string)
    }

    pub fn session_phase(&self, id: AccountId) -> SessionPhase {
        self.inner
            .registry
            .get(id)
            .map_or(SessionPhase::Disconnected, |s| s.lock().phase)
    }

    /// Every known session, by account id.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.inner
            .registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let session = self.inner.registry.get(id)?;
                let state = session.lock();
                Some(SessionSummary {
                    id,
                    label: state.label.clone(),
                    phase: state.phase.as_str(),
                    online: state.is_online(),
                    queued: self.inner.queue.is_queued(id),
                    world: state.capture.label().map(str::to_string),
                })
            })
            .collect()
    }

    /// Accounts waiting in the login queue, in order.
    pub fn queued_logins(&self) -> Vec<AccountId> {
        self.inner.queue.queued()
    }

    /// Sessions currently holding a connection handle.
    pub fn live_connections(&self) -> usize {
        self.inner.registry.live_connections()
    }

    /// Log in every account of a scope, one after another.
    pub async fn start_all_for_scope(
        &self,
        scope: &str,
    ) -> Result<Vec<(AccountId, LoginOutcome)>, FleetError> {
        let accounts = self.inner.store.list(scope).await?;
        info!(scope, count = accounts.len(), "starting accounts");

        let mut outcomes = Vec::with_capacity(accounts.len());
        for account in accounts {
            let outcome = self.login(account.id).await;
            if let LoginOutcome::Failed(reason) = &outcome {
                warn!(account = account.id, label = %account.label, %reason, "startup login failed");
            }
            outcomes.push((account.id, outcome));

            let login = &self.inner.config.login;
            let jitter = rand::thread_rng().gen_range(0..=login.jitter_ms);
            sleep(login.min_gap() + Duration::from_millis(jitter)).await;
        }
        Ok(outcomes)
    }

    /// Close the connection and recreate the account's token cache
    /// directory, forgetting the stored identity. Pending reconnects and
    /// queued logins for the account are dropped.
    ///
    /// Returns whether a cache directory existed.
    pub async fn force_wipe_cached_credentials(&self, id: AccountId) -> Result<bool, FleetError> {
        let session = self.session(id);
        let (conn, was_connected) = {
            let mut state = session.lock();
            state.cancel_reconnect();
            state.cancel_settle();
            state.capture.detach();
            state.draining = false;
            let was_connected = state.is_online();
            let conn = state.take_connection();
            state.apply(PhaseInput::Logout);
            (conn, was_connected)
        };
        self.inner.queue.remove(id);
        if let Some(conn) = conn {
            conn.close("force-wipe-auth");
        }
        session.set_online(false);
        if was_connected {
            crate::metrics::session_left();
        }

        let dir = self.inner.config.world.profile_dir(id);
        let existed = match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        tokio::fs::create_dir_all(&dir).await?;
        self.inner.store.update_identity(id, None, None).await?;

        info!(account = id, dir = %dir.display(), existed, "wiped cached credentials");
        Ok(existed)
    }

    /// Close every session and stop the login queue.
    pub async fn shutdown(&self) {
        if let Some(worker) = self.inner.worker.lock().take() {
            worker.abort();
        }
        for id in self.inner.registry.ids() {
            if self.inner.registry.get(id).is_some_and(|s| s.connection().is_some()) {
                self.logout(id).await;
            }
        }
    }

    /// Record a status change; failures are logged, not propagated.
    pub(crate) async fn record_status(&self, id: AccountId, status: AccountStatus) {
        if let Err(e) = self.inner.store.update_status(id, status, Utc::now()).await {
            warn!(account = id, status = status.as_str(), error = %e, "failed to record status");
        }
    }

    /// Post a notice; failures are logged, not propagated.
    pub(crate) async fn notify(&self, scope: &str, notice: Notice) {
        if let Err(e) = self.inner.sink.post(scope, &notice).await {
            warn!(scope, kind = notice.kind(), error = %e, "notification failed");
            crate::metrics::record_notify_failure();
        }
    }
}

#[async_trait]
impl LoginDriver for Fleet {
    fn is_online(&self, id: AccountId) -> bool {
        Fleet::is_online(self, id)
    }

    fn account_cooldown(&self, id: AccountId) -> Option<Instant> {
        self.inner.registry.get(id).and_then(|s| s.lock().cooldown_until)
    }

    async fn connect(&self, id: AccountId) -> LoginOutcome {
        self.connect_now(id).await
    }
}
