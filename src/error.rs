//! Unified error handling for fleetwatch.
//!
//! Non-error conditions (a login that is waiting for a human, a lookup that
//! timed out) are modelled as data elsewhere. What remains here is what a
//! caller has to react to.

use thiserror::Error;

use crate::notify::NotifyError;
use crate::store::{AccountId, StoreError};

/// Errors surfaced by [`crate::Fleet`] operations.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("empty command")]
    EmptyCommand,

    /// Accepted, not delivered yet: the command goes out once the account
    /// is back online.
    #[error("account {0} is offline; the command has been queued and will be sent after it reconnects")]
    CommandQueued(AccountId),

    #[error("account {0} is not online")]
    NotOnline(AccountId),

    #[error("no checker assigned for role '{role}' in scope '{scope}'")]
    NoChecker { scope: String, role: String },

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("connection error: {0}")]
    Proto(#[from] fleetwatch_proto::ProtoError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
}

impl From<StoreError> for FleetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::AccountNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl FleetError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::EmptyCommand => "empty_command",
            Self::CommandQueued(_) => "command_queued",
            Self::NotOnline(_) => "not_online",
            Self::NoChecker { .. } => "no_checker",
            Self::Store(_) => "store_error",
            Self::Proto(_) => "proto_error",
            Self::Io(_) => "io_error",
            Self::Notify(_) => "notify_error",
        }
    }

    /// Whether this is the "accepted and queued" condition rather than a
    /// hard failure.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::CommandQueued(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_is_distinct() {
        let queued = FleetError::CommandQueued(3);
        assert!(queued.is_queued());
        assert_eq!(queued.error_code(), "command_queued");
        assert!(queued.to_string().contains("queued"));
        assert!(!FleetError::EmptyCommand.is_queued());
    }

    #[test]
    fn test_store_not_found_maps_to_account() {
        let err: FleetError = StoreError::NotFound(9).into();
        assert!(matches!(err, FleetError::AccountNotFound(9)));
        let err: FleetError = StoreError::Backend("down".into()).into();
        assert_eq!(err.error_code(), "store_error");
    }
}
