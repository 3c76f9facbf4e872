//! Per-account session phase.
//!
//! ```text
//!                Connect                 Joined
//! ┌──────────────┐     ┌────────────┐ ───────────► ┌───────────┐
//! │ Disconnected ├────►│ Connecting │              │ Connected │
//! └──────▲───────┘     └─────┬──────┘              └─────┬─────┘
//!        │                   │ InteractiveCode           │
//!        │                   ▼                           │
//!        │     ┌─────────────────────────┐   Joined      │
//!        │     │ AwaitingInteractiveStep ├───────────────┤
//!        │     └─────────────────────────┘               │ Settled
//!        │                                         ┌─────▼─────┐
//!        └────────────────── Dropped / Logout ─────┤   Ready   │
//!                                                  └───────────┘
//! ```
//!
//! `AwaitingInteractiveStep` is sticky: a dropped transport does not leave it,
//! only a new connect, a join or an explicit logout does. `Connected` and
//! `Ready` both count as joined; only `Ready` accepts queued commands.

/// Where one account's connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Connecting,
    AwaitingInteractiveStep,
    Connected,
    /// Joined and done with the post-join settle sequence.
    Ready,
}

/// Inputs that move a session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    Connect,
    InteractiveCode,
    Joined,
    Settled,
    Dropped,
    Logout,
}

impl SessionPhase {
    /// The single transition function.
    pub fn on(self, input: PhaseInput) -> SessionPhase {
        use PhaseInput as I;
        use SessionPhase as P;

        match (self, input) {
            (_, I::Connect) => P::Connecting,
            (_, I::Logout) => P::Disconnected,
            (_, I::Joined) => P::Connected,
            (P::Connected, I::Settled) => P::Ready,
            (phase, I::Settled) => phase,
            (P::Connecting | P::AwaitingInteractiveStep, I::InteractiveCode) => {
                P::AwaitingInteractiveStep
            }
            // A code for a session that is not signing in is stale.
            (phase, I::InteractiveCode) => phase,
            (P::AwaitingInteractiveStep, I::Dropped) => P::AwaitingInteractiveStep,
            (_, I::Dropped) => P::Disconnected,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, SessionPhase::AwaitingInteractiveStep)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionPhase::Connected | SessionPhase::Ready)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionPhase::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Disconnected => "disconnected",
            SessionPhase::Connecting => "connecting",
            SessionPhase::AwaitingInteractiveStep => "awaiting-interactive",
            SessionPhase::Connected => "connected",
            SessionPhase::Ready => "ready",
        }
    }
}
