//! Account persistence.
//!
//! This module provides:
//! - The `AccountStore` contract the services depend on
//! - SQLite initialization, pragmas and schema/data migrations
//! - The SQLite-backed `Repository` and an in-memory store
//! - The account document codec, including legacy-shape normalization

pub mod document;
pub mod memory;
pub mod migrations;
pub mod repo;

pub use memory::MemoryAccountStore;
pub use migrations::init_db;
pub use repo::Repository;

use crate::domain::{Account, UserId, Version};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// A stored account together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub account: Account,
    pub version: Version,
    /// The stored document was in a legacy or incomplete shape and `account`
    /// is its normalized form. Writing it back makes the stored copy canonical.
    pub needs_normalization: bool,
    /// The stored document has no balance: something else (a watchlist edit)
    /// created it and the account was never opened for trading. `account`
    /// carries a zero placeholder balance.
    pub needs_opening: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account store unavailable: {0}")]
    Unavailable(String),
    /// The document changed since `expected` was read.
    #[error("account was modified concurrently (expected version {expected})")]
    Conflict { expected: Version },
    #[error("stored account for {uid} is unreadable: {reason}")]
    Corrupt { uid: UserId, reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Notification published after every committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChange {
    pub uid: UserId,
    pub version: Version,
}

/// What a subscriber observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Committed(Version),
    /// The subscriber fell behind and missed notifications; re-read the account.
    Lagged,
}

/// Per-user view over the store's change feed.
pub struct AccountSubscription {
    uid: UserId,
    rx: broadcast::Receiver<AccountChange>,
}

impl AccountSubscription {
    pub(crate) fn new(uid: UserId, rx: broadcast::Receiver<AccountChange>) -> Self {
        Self { uid, rx }
    }

    /// Wait for the next committed write to this user's account.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.uid == self.uid => {
                    return Some(Notification::Committed(change.version))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(uid = %self.uid, skipped, "Account subscription lagged");
                    return Some(Notification::Lagged);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Persistence contract for account documents.
///
/// Writes are conditional: a writer presents the version it read and the
/// write is rejected with [`StoreError::Conflict`] if anyone committed since.
#[async_trait]
pub trait AccountStore: Send + Sync + fmt::Debug {
    /// Read the current document, or `None` if the user has no account yet.
    async fn read(&self, uid: &UserId) -> Result<Option<AccountRecord>, StoreError>;

    /// Insert `account` if no document exists for `uid`.
    ///
    /// Returns whichever record ends up stored, so concurrent creators agree.
    async fn create(&self, uid: &UserId, account: &Account) -> Result<AccountRecord, StoreError>;

    /// Replace the document if its version is still `expected`.
    ///
    /// Returns the new version.
    async fn write(
        &self,
        uid: &UserId,
        account: &Account,
        expected: Version,
    ) -> Result<Version, StoreError>;

    /// Subscribe to committed writes for `uid`.
    fn subscribe(&self, uid: &UserId) -> AccountSubscription;
}

/// Capacity of the change feed shared by all subscribers.
pub(crate) const CHANGE_FEED_CAPACITY: usize = 256;
