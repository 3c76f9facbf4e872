//! State management module.
//!
//! Contains the session registry, per-account session state and the
//! process-wide login throttle.

mod phase;
mod registry;
mod session;
mod throttle;

pub use phase::{PhaseInput, SessionPhase};
pub use registry::SessionRegistry;
pub use session::{SessionHandle, SessionState};
pub use throttle::GlobalThrottle;
