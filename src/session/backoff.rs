//! Reconnect scheduling.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep};
use tracing::{Instrument, debug, info_span};

use super::queue::LoginQueue;
use crate::config::{BackoffMode, ReconnectConfig};
use crate::state::{GlobalThrottle, SessionRegistry};
use crate::store::AccountId;

/// Compute the backoff to use after `current`.
///
/// Fixed mode always resets to `min`. Multiplicative mode grows by half and
/// stays within `[min, max]`.
pub fn next_backoff(mode: BackoffMode, current: Duration, min: Duration, max: Duration) -> Duration {
    match mode {
        BackoffMode::Fixed => min,
        BackoffMode::Multiplicative => current.max(min).mul_f64(1.5).clamp(min, max.max(min)),
    }
}

/// Why a reconnect request was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AwaitingInteractive,
    Suppressed,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Skipped(SkipReason),
    /// A timer was already armed and the request was not forced.
    AlreadyPending,
    /// A timer fires after the given delay.
    Scheduled(Duration),
}

/// Arms per-account reconnect timers that feed the login queue.
pub struct Reconnector {
    registry: Arc<SessionRegistry>,
    throttle: Arc<GlobalThrottle>,
    queue: Arc<LoginQueue>,
    config: ReconnectConfig,
    jitter_ms: u64,
}

impl Reconnector {
    pub fn new(
        registry: Arc<SessionRegistry>,
        throttle: Arc<GlobalThrottle>,
        queue: Arc<LoginQueue>,
        config: ReconnectConfig,
        jitter_ms: u64,
    ) -> Self {
        Self {
            registry,
            throttle,
            queue,
            config,
            jitter_ms,
        }
    }

    /// Schedule a reconnect for `id`.
    ///
    /// The delay is `override_delay` (or the current backoff), stretched to
    /// reach the latest applicable cooldown, plus jitter. A pending timer
    /// is kept unless `force` is set.
    pub fn schedule(
        &self,
        id: AccountId,
        override_delay: Option<Duration>,
        force: bool,
    ) -> ReconnectDecision {
        if !self.config.auto {
            return ReconnectDecision::Skipped(SkipReason::Disabled);
        }

        let session = self.registry.get_or_create(id);
        let mut state = session.lock();
        if state.phase.is_awaiting() {
            return ReconnectDecision::Skipped(SkipReason::AwaitingInteractive);
        }
        if state.suppressed {
            return ReconnectDecision::Skipped(SkipReason::Suppressed);
        }

        let now = Instant::now();
        let mut base = override_delay.unwrap_or(state.backoff);
        if let Some(until) = self.throttle.wait_until(state.cooldown_until)
            && until > now
        {
            base = base.max(until - now);
        }
        let delay = base + Duration::from_millis(rand::thread_rng().gen_range(0..=self.jitter_ms));
        state.backoff = next_backoff(self.config.mode, state.backoff, self.config.min(), self.config.max());

        if state.reconnect_timer.is_some() {
            if !force {
                return ReconnectDecision::AlreadyPending;
            }
            state.cancel_reconnect();
        }

        state.reconnect_seq += 1;
        let seq = state.reconnect_seq;
        let queue = Arc::clone(&self.queue);
        let timer_session = Arc::clone(&session);
        let timer = tokio::spawn(
            async move {
                sleep(delay).await;
                {
                    let mut state = timer_session.lock();
                    if state.reconnect_seq == seq {
                        state.reconnect_timer = None;
                    }
                }
                queue.enqueue(id).await;
            }
            .instrument(info_span!("reconnect", account = id)),
        );
        state.reconnect_timer = Some(timer);

        debug!(account = id, delay_ms = delay.as_millis() as u64, force, "reconnect scheduled");
        crate::metrics::record_reconnect_scheduled();
        ReconnectDecision::Scheduled(delay)
    }

    /// Abort a pending timer. Returns whether one was armed.
    pub fn cancel(&self, id: AccountId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|session| session.lock().cancel_reconnect())
    }

    /// Whether a reconnect timer is armed for `id`.
    pub fn is_pending(&self, id: AccountId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|session| session.lock().reconnect_timer.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoginConfig;
    use crate::state::PhaseInput;

    const MIN: Duration = Duration::from_secs(15);

    #[test]
    fn test_fixed_backoff_resets_to_min() {
        let next = next_backoff(BackoffMode::Fixed, Duration::from_secs(40), MIN, Duration::from_secs(60));
        assert_eq!(next, MIN);
    }

    #[test]
    fn test_multiplicative_backoff_grows_and_clamps() {
        let max = Duration::from_secs(30);
        let a = next_backoff(BackoffMode::Multiplicative, MIN, MIN, max);
        assert_eq!(a, Duration::from_millis(22_500));
        let b = next_backoff(BackoffMode::Multiplicative, a, MIN, max);
        assert_eq!(b, max);
        let c = next_backoff(BackoffMode::Multiplicative, Duration::ZERO, MIN, max);
        assert_eq!(c, Duration::from_millis(22_500));
    }

    fn reconnector(config: ReconnectConfig) -> (Reconnector, Arc<SessionRegistry>, Arc<GlobalThrottle>) {
        let registry = Arc::new(SessionRegistry::new(config.min()));
        let throttle = Arc::new(GlobalThrottle::new());
        let queue = Arc::new(LoginQueue::new(throttle.clone(), LoginConfig::default()));
        let r = Reconnector::new(registry.clone(), throttle.clone(), queue, config, 1_500);
        (r, registry, throttle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_timer_is_idempotent_unless_forced() {
        let (r, _, _) = reconnector(ReconnectConfig::default());
        assert!(matches!(r.schedule(1, None, false), ReconnectDecision::Scheduled(_)));
        assert_eq!(r.schedule(1, None, false), ReconnectDecision::AlreadyPending);
        assert!(matches!(r.schedule(1, Some(MIN), true), ReconnectDecision::Scheduled(_)));
        assert!(r.is_pending(1));
        assert!(r.cancel(1));
        assert!(!r.is_pending(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips() {
        let (r, registry, _) = reconnector(ReconnectConfig::default());
        let session = registry.get_or_create(2);
        session.lock().apply(PhaseInput::Connect);
        session.lock().apply(PhaseInput::InteractiveCode);
        assert_eq!(
            r.schedule(2, None, true),
            ReconnectDecision::Skipped(SkipReason::AwaitingInteractive)
        );

        registry.get_or_create(3).lock().suppressed = true;
        assert_eq!(r.schedule(3, None, true), ReconnectDecision::Skipped(SkipReason::Suppressed));

        let disabled = ReconnectConfig {
            auto: false,
            ..ReconnectConfig::default()
        };
        let (r, _, _) = reconnector(disabled);
        assert_eq!(r.schedule(4, None, false), ReconnectDecision::Skipped(SkipReason::Disabled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_reaches_cooldown() {
        let (r, _, throttle) = reconnector(ReconnectConfig::default());
        let now = Instant::now();
        throttle.extend_network(now + Duration::from_secs(60), now);
        match r.schedule(5, Some(MIN), false) {
            ReconnectDecision::Scheduled(delay) => {
                assert!(delay >= Duration::from_secs(60));
                assert!(delay <= Duration::from_millis(61_500));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
