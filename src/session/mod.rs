//! Session management: admission, reconnects, lifecycle and the outbox.

mod backoff;
mod kick;
mod lifecycle;
mod outbox;
mod queue;

pub use backoff::{ReconnectDecision, Reconnector, SkipReason, next_backoff};
pub use kick::{KickClass, classify_kick};
pub use lifecycle::EnsureHome;
pub use queue::{LoginDriver, LoginOutcome, LoginQueue};
