//! In-memory account store for tests and ephemeral runs.

use super::document;
use super::{
    AccountChange, AccountRecord, AccountStore, AccountSubscription, StoreError,
    CHANGE_FEED_CAPACITY,
};
use crate::domain::{Account, UserId, Version};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Documents are kept as encoded JSON so reads go through the same codec as
/// the SQLite store.
#[derive(Debug, Clone)]
pub struct MemoryAccountStore {
    docs: Arc<RwLock<HashMap<UserId, (String, Version)>>>,
    changes: broadcast::Sender<AccountChange>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Seed a raw document, e.g. one written by an older client.
    pub async fn insert_raw(&self, uid: &UserId, raw: &str, version: Version) {
        self.docs
            .write()
            .await
            .insert(uid.clone(), (raw.to_string(), version));
    }

    /// Raw stored JSON for `uid`.
    pub async fn raw(&self, uid: &UserId) -> Option<String> {
        self.docs.read().await.get(uid).map(|(raw, _)| raw.clone())
    }

    fn publish(&self, uid: &UserId, version: Version) {
        // No receivers is fine.
        let _ = self.changes.send(AccountChange {
            uid: uid.clone(),
            version,
        });
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_record(uid: &UserId, raw: &str, version: Version) -> Result<AccountRecord, StoreError> {
    let decoded = document::decode(raw).map_err(|reason| StoreError::Corrupt {
        uid: uid.clone(),
        reason,
    })?;
    Ok(AccountRecord {
        account: decoded.account,
        version,
        needs_normalization: decoded.needs_normalization,
        needs_opening: decoded.needs_opening,
    })
}

fn encode_for(uid: &UserId, account: &Account) -> Result<String, StoreError> {
    document::encode(account).map_err(|reason| StoreError::Corrupt {
        uid: uid.clone(),
        reason,
    })
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn read(&self, uid: &UserId) -> Result<Option<AccountRecord>, StoreError> {
        let docs = self.docs.read().await;
        docs.get(uid)
            .map(|(raw, version)| decode_record(uid, raw, *version))
            .transpose()
    }

    async fn create(&self, uid: &UserId, account: &Account) -> Result<AccountRecord, StoreError> {
        let raw = encode_for(uid, account)?;
        let mut docs = self.docs.write().await;
        if let Some((existing, version)) = docs.get(uid) {
            return decode_record(uid, existing, *version);
        }
        let version = Version::initial();
        docs.insert(uid.clone(), (raw, version));
        drop(docs);

        self.publish(uid, version);
        Ok(AccountRecord {
            account: account.clone(),
            version,
            needs_normalization: false,
            needs_opening: false,
        })
    }

    async fn write(
        &self,
        uid: &UserId,
        account: &Account,
        expected: Version,
    ) -> Result<Version, StoreError> {
        let raw = encode_for(uid, account)?;
        let mut docs = self.docs.write().await;
        let next = match docs.get(uid) {
            Some((_, current)) if *current == expected => expected.next(),
            _ => return Err(StoreError::Conflict { expected }),
        };
        docs.insert(uid.clone(), (raw, next));
        drop(docs);

        self.publish(uid, next);
        Ok(next)
    }

    fn subscribe(&self, uid: &UserId) -> AccountSubscription {
        AccountSubscription::new(uid.clone(), self.changes.subscribe())
    }
}
