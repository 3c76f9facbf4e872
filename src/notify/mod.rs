//! Notification sink abstraction.
//!
//! Operator-facing messages (device codes to enter, rate-limit warnings,
//! rejected identities, scan reports) are posted to a scope through a
//! [`NotificationSink`]. Posting is best-effort: callers log failures and
//! carry on.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::tracker::ScanReport;

pub mod log;

pub use self::log::LogSink;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification target unavailable: {0}")]
    Unavailable(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// A message for the operators of one scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// An account needs a human to confirm a device code.
    DeviceCode {
        label: String,
        code: Option<String>,
        link: String,
        minutes: u64,
        /// Login the human should sign in with.
        email_hint: Option<String>,
    },
    /// The network refused new registrations; a global cooldown applies.
    NetworkCooldown { label: String },
    /// Upstream sign-in worked but world entry was refused.
    IdentityRejected { label: String, detail: String },
    /// A finished tracker scan.
    ScanReport(ScanReport),
}

impl Notice {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceCode { .. } => "device_code",
            Self::NetworkCooldown { .. } => "network_cooldown",
            Self::IdentityRejected { .. } => "identity_rejected",
            Self::ScanReport(_) => "scan_report",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceCode {
                label,
                code,
                link,
                minutes,
                email_hint,
            } => {
                writeln!(f, "Login required for {label}")?;
                writeln!(f, "Open {link} and enter code {}", code.as_deref().unwrap_or("-"))?;
                if let Some(email) = email_hint {
                    writeln!(f, "Sign in with: {email}")?;
                }
                let plural = if *minutes == 1 { "" } else { "s" };
                write!(f, "The code expires in ~{minutes} minute{plural}.")
            }
            Self::NetworkCooldown { label } => write!(
                f,
                "{label} got \"Unable to register you with the network\". \
                 Applied a short global cooldown; will retry automatically."
            ),
            Self::IdentityRejected { label, detail } => write!(
                f,
                "{label} signed in, but world login was rejected: {detail}"
            ),
            Self::ScanReport(report) => write!(f, "{report}"),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post a message to the operators of `scope`.
    async fn post(&self, scope: &str, notice: &Notice) -> Result<(), NotifyError>;
}
