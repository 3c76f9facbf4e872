//! In-memory credential store.
//!
//! Backs the daemon when accounts are declared in the config file, and the
//! test suite everywhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{AccountId, AccountStatus, AltAccount, CredentialStore, Secret, StoreError};
use crate::config::Config;

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, AltAccount>,
    /// (scope, role) -> account
    checkers: DashMap<(String, String), AccountId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the `[[account]]` and `[[checker]]` blocks.
    pub fn from_config(config: &Config) -> Self {
        let store = Self::new();
        for block in &config.accounts {
            let mut account = AltAccount::new(block.id, block.scope.clone(), block.label.clone());
            account.auth = block.auth;
            account.username = block.username.clone();
            account.password = block.password.as_deref().map(Secret::new);
            store.insert(account);
        }
        for checker in &config.checkers {
            store.assign_checker(&checker.scope, &checker.role, checker.account);
        }
        store
    }

    pub fn insert(&self, account: AltAccount) {
        self.accounts.insert(account.id, account);
    }

    pub fn remove(&self, id: AccountId) -> Option<AltAccount> {
        self.accounts.remove(&id).map(|(_, account)| account)
    }

    pub fn assign_checker(&self, scope: &str, role: &str, id: AccountId) {
        self.checkers.insert((scope.to_string(), role.to_string()), id);
    }

    /// Current status without going through the async trait.
    pub fn status_of(&self, id: AccountId) -> Option<AccountStatus> {
        self.accounts.get(&id).map(|a| a.status)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, id: AccountId) -> Result<AltAccount, StoreError> {
        self.accounts
            .get(&id)
            .map(|a| a.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_status(
        &self,
        id: AccountId,
        status: AccountStatus,
        last_seen: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        account.status = status;
        account.last_seen = Some(last_seen);
        Ok(())
    }

    async fn update_identity(
        &self,
        id: AccountId,
        world_id: Option<String>,
        world_name: Option<String>,
    ) -> Result<(), StoreError> {
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        account.world_id = world_id;
        account.world_name = world_name;
        Ok(())
    }

    async fn list(&self, scope: &str) -> Result<Vec<AltAccount>, StoreError> {
        let mut accounts: Vec<AltAccount> = self
            .accounts
            .iter()
            .filter(|a| a.scope == scope)
            .map(|a| a.value().clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn checker_for(&self, scope: &str, role: &str) -> Result<Option<AccountId>, StoreError> {
        Ok(self
            .checkers
            .get(&(scope.to_string(), role.to_string()))
            .map(|id| *id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_and_identity_updates() {
        let store = MemoryStore::new();
        store.insert(AltAccount::new(1, "g1", "alpha"));

        let now = Utc::now();
        store.update_status(1, AccountStatus::Online, now).await.unwrap();
        store
            .update_identity(1, Some("uuid-1".into()), Some("Alpha_MC".into()))
            .await
            .unwrap();

        let account = store.get(1).await.unwrap();
        assert_eq!(account.status, AccountStatus::Online);
        assert_eq!(account.last_seen, Some(now));
        assert_eq!(account.world_name.as_deref(), Some("Alpha_MC"));

        assert!(matches!(
            store.update_status(9, AccountStatus::Online, now).await,
            Err(StoreError::NotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_list_by_scope_sorted() {
        let store = MemoryStore::new();
        store.insert(AltAccount::new(5, "g1", "e"));
        store.insert(AltAccount::new(2, "g1", "b"));
        store.insert(AltAccount::new(3, "g2", "c"));

        let ids: Vec<_> = store.list("g1").await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[tokio::test]
    async fn test_seed_from_config() {
        let config = Config::from_toml(
            r#"
            [[account]]
            id = 4
            scope = "g1"
            label = "scout"
            password = "pw"

            [[checker]]
            scope = "g1"
            role = "shard"
            account = 4
            "#,
        )
        .unwrap();
        let store = MemoryStore::from_config(&config);
        let account = store.get(4).await.unwrap();
        assert_eq!(account.password.as_ref().map(Secret::expose), Some("pw"));
        assert_eq!(store.checker_for("g1", "shard").await.unwrap(), Some(4));
        assert_eq!(store.checker_for("g1", "rpost").await.unwrap(), None);
    }
}
