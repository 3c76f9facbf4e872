//! Outbound command queue and pacing.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_proto::WorldConnection;
use rand::Rng;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{Instrument, debug, info_span, warn};

use crate::config::slash_command;
use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::state::SessionHandle;
use crate::store::AccountId;

/// Random delay before an offline command triggers a login.
const QUEUED_LOGIN_DELAY_MS: std::ops::RangeInclusive<u64> = 2_000..=4_000;

impl Fleet {
    /// Send an in-world command, queueing it while the account is offline.
    ///
    /// Text without a leading `/` gets one. Commands only go out once the
    /// post-join settle sequence has finished; a joined account that is
    /// still settling keeps them in the outbox until then. When the account
    /// is offline the command stays in the outbox and
    /// [`FleetError::CommandQueued`] is returned; a login is queued unless
    /// one is already on its way or the account waits for an interactive
    /// sign-in.
    pub fn send_command(&self, id: AccountId, text: &str) -> Result<(), FleetError> {
        let line = slash_command(text).ok_or(FleetError::EmptyCommand)?;
        let session = self.session(id);
        let (ready, online, awaiting, pending) = {
            let mut state = session.lock();
            state.outbox.push_back(line);
            (
                state.accepts_commands(),
                state.is_online(),
                state.phase.is_awaiting(),
                state.reconnect_timer.is_some(),
            )
        };

        if ready {
            self.spawn_drain(id);
            return Ok(());
        }
        if online {
            debug!(account = id, "session settling, command held until ready");
            return Ok(());
        }

        if !awaiting && !pending {
            let delay = Duration::from_millis(rand::thread_rng().gen_range(QUEUED_LOGIN_DELAY_MS));
            let queue = Arc::clone(&self.inner.queue);
            tokio::spawn(async move {
                sleep(delay).await;
                queue.enqueue(id).await;
            });
        }
        Err(FleetError::CommandQueued(id))
    }

    pub(crate) fn spawn_drain(&self, id: AccountId) {
        let fleet = self.clone();
        tokio::spawn(
            async move { fleet.drain_outbox(id).await }.instrument(info_span!("drain", account = id)),
        );
    }

    /// Send queued commands in order while the account stays ready.
    async fn drain_outbox(&self, id: AccountId) {
        let session = self.session(id);
        {
            let mut state = session.lock();
            if state.draining || state.outbox.is_empty() {
                return;
            }
            state.draining = true;
        }

        let _guard = session.command_guard().await;
        loop {
            let next = {
                let mut state = session.lock();
                let conn = state.connection.clone().filter(|_| state.phase.is_ready());
                let next = match conn {
                    Some(conn) => state.outbox.pop_front().map(|line| (line, conn)),
                    None => None,
                };
                if next.is_none() {
                    state.draining = false;
                }
                next
            };
            let Some((line, conn)) = next else {
                return;
            };

            if !self.send_line(&session, &conn, &line).await {
                let mut state = session.lock();
                state.outbox.push_front(line);
                state.draining = false;
                return;
            }
        }
    }

    /// Send one line, spaced at least the chat cooldown after the previous
    /// outbound line of this account.
    pub(crate) async fn send_line(
        &self,
        session: &SessionHandle,
        conn: &Arc<dyn WorldConnection>,
        line: &str,
    ) -> bool {
        let cooldown = self.inner.config.chat.cooldown();
        let slot = {
            let mut state = session.lock();
            let now = Instant::now();
            let slot = state.last_outbound.map_or(now, |last| (last + cooldown).max(now));
            state.last_outbound = Some(slot);
            slot
        };
        sleep_until(slot).await;

        match conn.send_text(line) {
            Ok(()) => {
                debug!(account = session.id, %line, "sent");
                crate::metrics::record_command_sent();
                true
            }
            Err(e) => {
                warn!(account = session.id, %line, error = %e, "send failed");
                false
            }
        }
    }
}
