//! Repository layer for database operations.
//!
//! `Repository` is the SQLite-backed [`AccountStore`]. Account SQL lives in
//! `accounts.rs`; this module wires it to the store contract and the change
//! feed.

mod accounts;

use super::{
    AccountChange, AccountRecord, AccountStore, AccountSubscription, StoreError,
    CHANGE_FEED_CAPACITY,
};
use crate::domain::{Account, UserId, Version};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tokio::sync::broadcast;
use tracing::debug;

/// Repository for database operations.
#[derive(Debug)]
pub struct Repository {
    pool: SqlitePool,
    changes: broadcast::Sender<AccountChange>,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Repository { pool, changes }
    }

    fn publish(&self, uid: &UserId, version: Version) {
        debug!(uid = %uid, version = %version, "Account committed");
        // Nobody listening is not an error.
        let _ = self.changes.send(AccountChange {
            uid: uid.clone(),
            version,
        });
    }
}

#[async_trait]
impl AccountStore for Repository {
    async fn read(&self, uid: &UserId) -> Result<Option<AccountRecord>, StoreError> {
        self.fetch_account(uid).await
    }

    async fn create(&self, uid: &UserId, account: &Account) -> Result<AccountRecord, StoreError> {
        if self.insert_account_if_absent(uid, account).await? {
            self.publish(uid, Version::initial());
            return Ok(AccountRecord {
                account: account.clone(),
                version: Version::initial(),
                needs_normalization: false,
                needs_opening: false,
            });
        }

        // Lost the race to another creator; report what they stored.
        self.fetch_account(uid).await?.ok_or_else(|| StoreError::Corrupt {
            uid: uid.clone(),
            reason: "account vanished after insert conflict".to_string(),
        })
    }

    async fn write(
        &self,
        uid: &UserId,
        account: &Account,
        expected: Version,
    ) -> Result<Version, StoreError> {
        let next = self.update_account_if_version(uid, account, expected).await?;
        self.publish(uid, next);
        Ok(next)
    }

    fn subscribe(&self, uid: &UserId) -> AccountSubscription {
        AccountSubscription::new(uid.clone(), self.changes.subscribe())
    }
}
