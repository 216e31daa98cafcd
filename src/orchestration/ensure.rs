use super::{LedgerSettings, TradeError};
use crate::db::{AccountRecord, AccountStore, StoreError};
use crate::domain::{Account, UserId, Version};
use tracing::{debug, info, warn};

/// Read the account for `uid`, opening it at the starting balance if absent.
///
/// A stored document that was never opened (no balance) is opened in place,
/// keeping whatever watchlist it already carries.
pub async fn ensure_account(
    store: &dyn AccountStore,
    uid: &UserId,
    settings: &LedgerSettings,
) -> Result<AccountRecord, StoreError> {
    let mut expected = Version::initial();

    for _ in 0..settings.retry_limit.max(1) {
        let Some(record) = store.read(uid).await? else {
            info!(uid = %uid, balance = %settings.starting_balance, "Opening account");
            return store
                .create(uid, &Account::opening(settings.starting_balance))
                .await;
        };
        if !record.needs_opening {
            return Ok(record);
        }

        info!(uid = %uid, balance = %settings.starting_balance, "Opening account over existing watchlist");
        let mut account = record.account;
        account.balance = settings.starting_balance;
        match store.write(uid, &account, record.version).await {
            Ok(version) => {
                return Ok(AccountRecord {
                    account,
                    version,
                    needs_normalization: false,
                    needs_opening: false,
                })
            }
            Err(StoreError::Conflict { expected: seen }) => expected = seen,
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::Conflict { expected })
}

/// Outcome of one read-compute step.
pub enum Change<T> {
    /// Persist this account state.
    Write(Account, T),
    /// Nothing to persist (beyond normalizing a legacy document).
    Unchanged(T),
}

/// The state that ended up committed (or found unchanged).
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub account: Account,
    pub version: Version,
}

/// Run `apply` against a fresh snapshot and write the result conditionally.
///
/// On a version conflict the whole cycle repeats, so `apply` always sees the
/// latest committed state. Errors from `apply` abort immediately.
pub async fn update_account<T, F>(
    store: &dyn AccountStore,
    uid: &UserId,
    settings: &LedgerSettings,
    mut apply: F,
) -> Result<Committed<T>, TradeError>
where
    F: FnMut(&Account) -> Result<Change<T>, TradeError>,
{
    let attempts = settings.retry_limit.max(1);

    for attempt in 1..=attempts {
        let record = ensure_account(store, uid, settings).await?;

        let (next, value) = match apply(&record.account)? {
            Change::Write(next, value) => (next, value),
            Change::Unchanged(value) if record.needs_normalization => {
                debug!(uid = %uid, "Persisting normalized account document");
                (record.account, value)
            }
            Change::Unchanged(value) => {
                return Ok(Committed {
                    value,
                    account: record.account,
                    version: record.version,
                })
            }
        };

        match store.write(uid, &next, record.version).await {
            Ok(version) => {
                return Ok(Committed {
                    value,
                    account: next,
                    version,
                })
            }
            Err(StoreError::Conflict { expected }) => {
                warn!(uid = %uid, attempt, expected = %expected, "Account write conflicted, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(TradeError::Conflict { attempts })
}
