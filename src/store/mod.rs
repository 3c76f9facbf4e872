//! Credential store abstraction.
//!
//! Account records live outside fleetwatch. The store hands them over with
//! secrets already decrypted and receives status and identity updates back;
//! fleetwatch itself never persists a secret.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetwatch_proto::AuthMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod memory;

pub use memory::MemoryStore;

/// Store-assigned account identifier.
pub type AccountId = u64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    NotFound(AccountId),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Last known account status as shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountStatus {
    #[default]
    Offline,
    Online,
    /// Waiting for a human to confirm a device code.
    AuthWait,
    Error,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::AuthWait => "auth-wait",
            Self::Error => "error",
        }
    }
}

/// A decrypted secret that is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string (for handing to the connector).
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print actual content
        f.debug_struct("Secret").field("len", &self.0.len()).finish()
    }
}

/// One managed account.
#[derive(Debug, Clone)]
pub struct AltAccount {
    pub id: AccountId,
    /// Owning scope; notifications for this account go there.
    pub scope: String,
    pub label: String,
    pub auth: AuthMode,
    /// Login name (email for device-code accounts).
    pub username: Option<String>,
    pub password: Option<Secret>,
    /// Last known in-world unique id.
    pub world_id: Option<String>,
    /// Last known in-world name.
    pub world_name: Option<String>,
    pub status: AccountStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

impl AltAccount {
    pub fn new(id: AccountId, scope: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id,
            scope: scope.into(),
            label: label.into(),
            auth: AuthMode::Direct,
            username: None,
            password: None,
            world_id: None,
            world_name: None,
            status: AccountStatus::Offline,
            last_seen: None,
        }
    }

    /// Name handed to the connector.
    ///
    /// Device-code accounts sign in with their configured login name; direct
    /// accounts prefer the last known in-world name. Both fall back to the
    /// label and finally to `alt-<id>`.
    pub fn login_name(&self) -> String {
        let preferred = match self.auth {
            AuthMode::InteractiveDevice => self.username.as_deref(),
            AuthMode::Direct => self.world_name.as_deref().or(self.username.as_deref()),
        };
        preferred
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.label.trim()).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("alt-{}", self.id))
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch one account with its secrets decrypted.
    async fn get(&self, id: AccountId) -> Result<AltAccount, StoreError>;

    /// Record the latest status.
    async fn update_status(
        &self,
        id: AccountId,
        status: AccountStatus,
        last_seen: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record (or clear) the in-world identity.
    async fn update_identity(
        &self,
        id: AccountId,
        world_id: Option<String>,
        world_name: Option<String>,
    ) -> Result<(), StoreError>;

    /// All accounts owned by a scope, in a stable order.
    async fn list(&self, scope: &str) -> Result<Vec<AltAccount>, StoreError>;

    /// The account assigned to `role` within `scope`, if any.
    async fn checker_for(&self, scope: &str, role: &str) -> Result<Option<AccountId>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.expose(), "hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    #[test]
    fn test_login_name_fallbacks() {
        let mut account = AltAccount::new(3, "g", "  ");
        assert_eq!(account.login_name(), "alt-3");

        account.label = "scout".into();
        assert_eq!(account.login_name(), "scout");

        account.username = Some("scout@example.net".into());
        assert_eq!(account.login_name(), "scout@example.net");

        account.world_name = Some("Scout_MC".into());
        assert_eq!(account.login_name(), "Scout_MC");

        account.auth = AuthMode::InteractiveDevice;
        assert_eq!(account.login_name(), "scout@example.net");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(AccountStatus::AuthWait.as_str(), "auth-wait");
        assert_eq!(
            serde_json::to_string(&AccountStatus::AuthWait).unwrap(),
            "\"auth-wait\""
        );
    }
}
