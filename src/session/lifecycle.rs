//! Session lifecycle.
//!
//! `connect_now` opens a connection and hands its event stream to a
//! per-connection actor task. The actor applies every event to the
//! account's state through the phase transition function; events from a
//! replaced connection carry an old generation and stop the actor.
//!
//! ```text
//!  join ──► attach capture ──► hop ──► home ──► confirm pass ──► arm ──► ready ──► drain
//!            (disarmed)       settle   +max(2s, server+0.5s)
//!                                              +max(5s, server+2.5s)
//! ```

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_proto::{ConnectOptions, DeviceCode, EventStream, SessionEvent};
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{Instrument, Span, debug, info, warn};

use super::kick::{KickClass, classify_kick};
use super::queue::LoginOutcome;
use crate::config::SettleConfig;
use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::notify::Notice;
use crate::query::await_first_match;
use crate::state::{PhaseInput, SessionHandle};
use crate::store::{AccountId, AccountStatus};
use crate::telemetry::spans;

/// Floor for the pause after the hop command.
const MIN_HOP_DELAY: Duration = Duration::from_millis(2_000);
/// Floor for one confirmation wait.
const MIN_CONFIRM_WAIT: Duration = Duration::from_millis(2_500);

/// A scripted "go home and confirm" pass.
#[derive(Debug, Clone)]
pub struct EnsureHome {
    /// Hop command sent first, if any.
    pub hop: Option<String>,
    pub hop_delay: Duration,
    /// Home command; `None` skips confirmation entirely.
    pub home: Option<String>,
    pub attempts: u32,
    /// Pause between failed attempts.
    pub gap: Duration,
}

impl EnsureHome {
    /// The pass run at the end of the post-join settle sequence.
    pub fn redundancy(settle: &SettleConfig) -> Self {
        Self {
            hop: settle.server_command(),
            hop_delay: settle.server_delay().max(MIN_HOP_DELAY),
            home: settle.home_command(),
            attempts: settle.redundancy_attempts,
            gap: Duration::from_millis(settle.redundancy_gap_ms),
        }
    }

    /// The pass run on demand, e.g. before a tracker scan.
    pub fn standard(settle: &SettleConfig) -> Self {
        Self {
            attempts: settle.ensure_attempts,
            gap: Duration::from_millis(settle.ensure_gap_ms),
            ..Self::redundancy(settle)
        }
    }

    fn confirm_wait(&self) -> Duration {
        self.gap
            .saturating_sub(Duration::from_millis(250))
            .max(MIN_CONFIRM_WAIT)
    }
}

/// How a connection ended.
#[derive(Debug)]
enum DropCause {
    Disconnected(String),
    Kicked(String),
}

fn resolve(ready: &mut Option<oneshot::Sender<LoginOutcome>>, outcome: LoginOutcome) {
    if let Some(tx) = ready.take() {
        let _ = tx.send(outcome);
    }
}

impl Fleet {
    /// Open a fresh connection for `id` and wait for its first decisive
    /// event. Only the login queue calls this.
    pub(crate) async fn connect_now(&self, id: AccountId) -> LoginOutcome {
        let account = match self.inner.store.get(id).await {
            Ok(account) => account,
            Err(e) => {
                warn!(account = id, error = %e, "cannot load account");
                return LoginOutcome::Failed(e.to_string());
            }
        };

        let session = self.session(id);
        let min_backoff = self.inner.config.reconnect.min();
        let (stale, was_connected) = {
            let mut state = session.lock();
            state.scope = Some(account.scope.clone());
            state.label = Some(account.label.clone());
            state.backoff = min_backoff;
            state.suppressed = false;
            state.code_expires_at = None;
            state.capture.detach();
            state.cancel_settle();
            state.cancel_reconnect();
            let was_connected = state.is_online();
            let stale = state.take_connection();
            state.apply(PhaseInput::Connect);
            (stale, was_connected)
        };
        if let Some(stale) = stale {
            stale.close("relogin");
        }
        session.set_online(false);
        if was_connected {
            crate::metrics::session_left();
        }

        let world = &self.inner.config.world;
        let profiles_dir = world.profile_dir(id);
        if let Err(e) = tokio::fs::create_dir_all(&profiles_dir).await {
            warn!(account = id, dir = %profiles_dir.display(), error = %e, "cannot create token cache directory");
        }

        let options = ConnectOptions {
            host: world.host.clone(),
            port: world.port,
            version: world.version.clone(),
            username: account.login_name(),
            auth: account.auth,
            profiles_dir,
            check_timeout: world.check_timeout(),
            password: account.password.as_ref().map(|p| p.expose().to_string()),
        };
        info!(
            account = id,
            label = %account.label,
            host = %options.host,
            port = options.port,
            auth = %options.auth,
            username = %options.username,
            "logging in"
        );

        let (conn, events) = match self.inner.connector.connect(options).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(account = id, error = %e, "connect failed");
                session.lock().apply(PhaseInput::Dropped);
                self.record_status(id, AccountStatus::Error).await;
                self.inner.reconnector.schedule(id, Some(min_backoff), true);
                return LoginOutcome::Failed(e.to_string());
            }
        };

        let generation = session.lock().install_connection(conn);
        let (ready_tx, ready_rx) = oneshot::channel();
        let email_hint = account.username.clone().filter(|u| !u.trim().is_empty());
        let actor = self
            .clone()
            .run_session(id, generation, email_hint, events, ready_tx);
        tokio::spawn(actor.instrument(spans::account(id, &account.label)));

        match timeout(self.inner.config.login.join_timeout(), ready_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => LoginOutcome::Failed("session ended before a decisive event".to_string()),
            Err(_) => {
                info!(account = id, "no decisive event within the join timeout");
                LoginOutcome::Pending
            }
        }
    }

    async fn run_session(
        self,
        id: AccountId,
        generation: u64,
        email_hint: Option<String>,
        mut events: EventStream,
        ready: oneshot::Sender<LoginOutcome>,
    ) {
        let session = self.session(id);
        let mut ready = Some(ready);

        while let Some(event) = events.recv().await {
            if session.lock().generation != generation {
                debug!(event = event.kind(), "connection replaced, stopping actor");
                return;
            }
            match event {
                SessionEvent::Joined { username, unique_id } => {
                    self.on_joined(&session, generation, username, unique_id).await;
                    resolve(&mut ready, LoginOutcome::Online);
                }
                SessionEvent::DisplayChanged(objective) => {
                    let label = session.lock().capture.observe(objective);
                    if let Some(label) = label {
                        info!(world = %label, "world label changed");
                    }
                }
                SessionEvent::Chat(line) => session.publish_chat(line),
                SessionEvent::Disconnected { reason } => {
                    self.on_dropped(&session, generation, DropCause::Disconnected(reason.clone()))
                        .await;
                    resolve(&mut ready, LoginOutcome::Failed(format!("disconnected: {reason}")));
                    return;
                }
                SessionEvent::Kicked { reason } => {
                    self.on_dropped(&session, generation, DropCause::Kicked(reason.clone()))
                        .await;
                    resolve(&mut ready, LoginOutcome::Failed(format!("kicked: {reason}")));
                    return;
                }
                SessionEvent::ProtocolError { message } => {
                    if !self.on_protocol_error(&session, &message).await {
                        resolve(&mut ready, LoginOutcome::Failed(message));
                    }
                }
                SessionEvent::InteractiveCode(code) => {
                    self.on_interactive_code(&session, code, email_hint.clone()).await;
                    resolve(&mut ready, LoginOutcome::AwaitingInteractive);
                }
            }
        }

        // The adapter dropped the stream without saying goodbye.
        if session.lock().generation == generation {
            self.on_dropped(&session, generation, DropCause::Disconnected("connection closed".to_string()))
                .await;
            resolve(&mut ready, LoginOutcome::Failed("connection closed".to_string()));
        }
    }

    async fn on_joined(
        &self,
        session: &Arc<SessionHandle>,
        generation: u64,
        username: String,
        unique_id: Option<String>,
    ) {
        let id = session.id;
        {
            let mut state = session.lock();
            state.apply(PhaseInput::Joined);
            state.suppressed = false;
            state.code_expires_at = None;
            state.username = Some(username.clone());
            state.capture.attach();
        }

        let login = &self.inner.config.login;
        self.inner
            .throttle
            .extend_registration_lock(Instant::now() + login.registration_lock());
        session.set_online(true);
        crate::metrics::session_joined();
        info!(account = id, username = %username, "joined world");

        self.record_status(id, AccountStatus::Online).await;
        if let Err(e) = self
            .inner
            .store
            .update_identity(id, unique_id, Some(username))
            .await
        {
            warn!(account = id, error = %e, "failed to record identity");
        }

        let task = tokio::spawn(
            self.clone()
                .settle(Arc::clone(session), generation)
                .instrument(Span::current()),
        );
        let mut state = session.lock();
        if state.generation == generation {
            state.cancel_settle();
            state.settle_task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Post-join script: hop, home, confirm-and-arm, then mark the session
    /// ready and drain the outbox. Every send holds the command guard.
    async fn settle(self, session: Arc<SessionHandle>, generation: u64) {
        let settle = &self.inner.config.settle;
        let server_delay = settle.server_delay();
        let hop_at = Instant::now() + settle.settle_delay();
        let home_at = hop_at + (server_delay + Duration::from_millis(500)).max(MIN_HOP_DELAY);
        let confirm_at =
            hop_at + (server_delay + Duration::from_millis(2_500)).max(Duration::from_millis(5_000));

        if let Some(hop) = settle.server_command() {
            sleep_until(hop_at).await;
            let _guard = session.command_guard().await;
            let Some(conn) = session.lock().connection_for(generation) else {
                return;
            };
            self.send_line(&session, &conn, &hop).await;
        }

        if let Some(home) = settle.home_command() {
            sleep_until(home_at).await;
            let _guard = session.command_guard().await;
            let Some(conn) = session.lock().connection_for(generation) else {
                return;
            };
            self.send_line(&session, &conn, &home).await;
        }

        sleep_until(confirm_at).await;
        let confirmed = self
            .ensure_home_with(&session, generation, &EnsureHome::redundancy(settle))
            .await;
        if !confirmed {
            warn!(account = session.id, "home not confirmed; world capture stays disarmed");
        }

        let settled = {
            let mut state = session.lock();
            let current = state.generation == generation && state.connection.is_some();
            if current {
                state.apply(PhaseInput::Settled);
            }
            current
        };
        if settled {
            debug!(account = session.id, "settled, accepting commands");
            self.spawn_drain(session.id);
        }
    }

    /// Make sure the account is online and home, arming world capture on
    /// confirmation. Returns whether home was confirmed.
    pub async fn ensure_home(&self, id: AccountId) -> Result<bool, FleetError> {
        self.ensure_online(id).await?;
        let session = self.session(id);
        let generation = session.lock().generation;
        let plan = EnsureHome::standard(&self.inner.config.settle);
        Ok(self.ensure_home_with(&session, generation, &plan).await)
    }

    /// Log in through the queue if needed and wait for the join.
    pub(crate) async fn ensure_online(&self, id: AccountId) -> Result<(), FleetError> {
        if self.is_online(id) {
            return Ok(());
        }
        let outcome = self.login(id).await;
        debug!(account = id, outcome = outcome.label(), "login for ensure_online");
        if self
            .wait_for_online(id, self.inner.config.tracker.bot_wait())
            .await
        {
            Ok(())
        } else {
            Err(FleetError::NotOnline(id))
        }
    }

    pub(crate) async fn ensure_home_with(
        &self,
        session: &Arc<SessionHandle>,
        generation: u64,
        plan: &EnsureHome,
    ) -> bool {
        let _guard = session.command_guard().await;
        let Some(conn) = session.lock().connection_for(generation) else {
            return false;
        };

        if let Some(hop) = &plan.hop {
            self.send_line(session, &conn, hop).await;
            sleep(plan.hop_delay).await;
        }
        let Some(home) = &plan.home else {
            return true;
        };

        let patterns = &self.inner.patterns;
        for attempt in 1..=plan.attempts {
            let mut chat = session.subscribe_chat();
            if !self.send_line(session, &conn, home).await {
                return false;
            }
            let confirmed = await_first_match(&mut chat, plan.confirm_wait(), |line| {
                patterns.is_home_confirmation(line).then_some(())
            })
            .await
            .is_some();

            if confirmed {
                let probe = conn.sidebar();
                let label = {
                    let mut state = session.lock();
                    if state.generation != generation {
                        return false;
                    }
                    state.capture.arm(probe)
                };
                info!(account = session.id, attempt, "home confirmed, world capture armed");
                if let Some(label) = label {
                    info!(account = session.id, world = %label, "world label captured");
                }
                return true;
            }

            debug!(account = session.id, attempt, "no home confirmation");
            if attempt < plan.attempts {
                sleep(plan.gap).await;
            }
        }
        false
    }

    async fn on_interactive_code(
        &self,
        session: &Arc<SessionHandle>,
        code: DeviceCode,
        email_hint: Option<String>,
    ) {
        let id = session.id;
        let lifetime = code.lifetime();
        let (scope, label) = {
            let mut state = session.lock();
            state.apply(PhaseInput::InteractiveCode);
            state.code_expires_at = Some(Instant::now() + lifetime);
            (state.scope.clone().unwrap_or_default(), state.display_name(id))
        };

        let minutes = ((lifetime.as_secs() + 30) / 60).max(1);
        let notice = Notice::DeviceCode {
            label,
            code: code.code(),
            link: code.link(),
            minutes,
            email_hint,
        };
        info!(account = id, minutes, "interactive sign-in required");
        self.notify(&scope, notice).await;
        self.record_status(id, AccountStatus::AuthWait).await;
    }

    async fn on_dropped(&self, session: &Arc<SessionHandle>, generation: u64, cause: DropCause) {
        let id = session.id;
        let (was_connected, awaiting, suppressed, scope, label) = {
            let mut state = session.lock();
            if state.generation != generation {
                return;
            }
            state.capture.detach();
            state.cancel_settle();
            let was_connected = state.is_online();
            // The transport is already gone.
            let _ = state.take_connection();
            let phase = state.apply(PhaseInput::Dropped);
            (
                was_connected,
                phase.is_awaiting(),
                state.suppressed,
                state.scope.clone().unwrap_or_default(),
                state.display_name(id),
            )
        };
        session.set_online(false);
        if was_connected {
            crate::metrics::session_left();
        }

        let status = if awaiting {
            AccountStatus::AuthWait
        } else {
            AccountStatus::Offline
        };
        self.record_status(id, status).await;

        match cause {
            DropCause::Disconnected(reason) => {
                warn!(account = id, %reason, "disconnected");
            }
            DropCause::Kicked(reason) => {
                let class = classify_kick(&reason, &self.inner.patterns);
                warn!(account = id, %reason, class = class.as_str(), "kicked");
                crate::metrics::record_kick(class.as_str());
                self.apply_kick_throttle(session, class, &scope, label).await;
            }
        }

        if !awaiting && !suppressed {
            let min = self.inner.config.reconnect.min();
            self.inner.reconnector.schedule(id, Some(min), true);
        }
    }

    async fn apply_kick_throttle(
        &self,
        session: &SessionHandle,
        class: KickClass,
        scope: &str,
        label: String,
    ) {
        let now = Instant::now();
        match class {
            KickClass::TooFast => {
                let until = now + self.inner.config.login.login_throttle();
                session.lock().extend_cooldown(until);
            }
            KickClass::NetworkRegister => {
                let until = now + self.inner.config.reconnect.min();
                let opened = self.inner.throttle.extend_network(until, now);
                session.lock().extend_cooldown(until);
                if opened {
                    self.notify(scope, Notice::NetworkCooldown { label }).await;
                }
            }
            KickClass::Other => {}
        }
    }

    /// Returns whether the error was absorbed by a pending interactive step.
    async fn on_protocol_error(&self, session: &Arc<SessionHandle>, message: &str) -> bool {
        let id = session.id;
        let (awaiting, scope, label) = {
            let state = session.lock();
            (
                state.phase.is_awaiting(),
                state.scope.clone().unwrap_or_default(),
                state.display_name(id),
            )
        };
        warn!(account = id, error = %message, "protocol error");

        if self.inner.patterns.identity_rejected.is_match(message) {
            let notice = Notice::IdentityRejected {
                label,
                detail: message.to_string(),
            };
            self.notify(&scope, notice).await;
        }

        if awaiting {
            self.record_status(id, AccountStatus::AuthWait).await;
            return true;
        }
        self.record_status(id, AccountStatus::Error).await;
        let min = self.inner.config.reconnect.min();
        self.inner.reconnector.schedule(id, Some(min), true);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_plans_follow_config() {
        let settle = Config::default().settle;
        let redundancy = EnsureHome::redundancy(&settle);
        assert_eq!(redundancy.attempts, 4);
        assert_eq!(redundancy.gap, Duration::from_millis(4_000));
        assert_eq!(redundancy.hop_delay, Duration::from_millis(8_000));
        assert_eq!(redundancy.confirm_wait(), Duration::from_millis(3_750));

        let standard = EnsureHome::standard(&settle);
        assert_eq!(standard.attempts, 3);
        assert_eq!(standard.home.as_deref(), Some("/home home"));
        assert_eq!(standard.hop.as_deref(), Some("/server factions"));
    }

    #[test]
    fn test_confirm_wait_floor() {
        let plan = EnsureHome {
            hop: None,
            hop_delay: Duration::ZERO,
            home: None,
            attempts: 1,
            gap: Duration::from_millis(1_000),
        };
        assert_eq!(plan.confirm_wait(), MIN_CONFIRM_WAIT);
    }
}
