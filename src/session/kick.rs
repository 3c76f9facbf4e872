//! Kick reason classification.

use crate::config::Patterns;

/// Rate-limit signals recognised in kick text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickClass {
    /// The account itself logged in too soon after its last attempt.
    TooFast,
    /// The network is refusing new registrations from everyone.
    NetworkRegister,
    Other,
}

impl KickClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooFast => "too_fast",
            Self::NetworkRegister => "network_register",
            Self::Other => "other",
        }
    }
}

pub fn classify_kick(reason: &str, patterns: &Patterns) -> KickClass {
    if patterns.too_fast.is_match(reason) {
        KickClass::TooFast
    } else if patterns.network_register.is_match(reason) {
        KickClass::NetworkRegister
    } else {
        KickClass::Other
    }
}
